//! Core types for Scout automation
//!
//! This crate provides the value layer shared by the condition evaluator and the
//! sequence engine: typed [`Value`]s, the [`VariableStore`] threaded through a run,
//! literal parsing and `${name}` substitution.

mod error;
mod expression;
mod value;
mod variables;

pub use error::{ValueError, ValueResult};
pub use expression::{parse_value, substitute};
pub use value::Value;
pub use variables::VariableStore;
