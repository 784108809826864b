//! Condition Language
//!
//! Conditions gate branches and loops in automation sequences. A condition is a
//! single line of text evaluated against the run's variable store:
//!
//! ```text
//! ${gold} >= 500 and ${state} == 'idle'
//! ```
//!
//! # Evaluation
//!
//! 1. `or` then `and` split the raw text into sub-conditions
//! 2. Comparisons are detected longest operator first: `== != >= <= > <`
//! 3. Each operand is substituted on its own, then parsed as a literal, so a
//!    variable holding `Gold or Silver` stays one operand
//! 4. `true` / `false` literals, or a bare name of a bound variable
//!
//! Anything else is an error rather than a silent `false`.
//!
//! # Key Types
//!
//! - [`Condition`] - Parsed condition tree
//! - [`ConditionEvaluator`] - Evaluates condition text against a [`VariableStore`]
//!
//! [`VariableStore`]: scout_core::VariableStore

pub mod condition;
pub mod eval;

pub use condition::{CompareOp, Condition, ConditionError, ConditionResult};
pub use eval::ConditionEvaluator;
