//! Sequence Engine
//!
//! This crate provides the sequence execution engine for Scout. A sequence is a
//! tree of action nodes walked against a mutable execution context: leaf
//! actions are forwarded to an external collaborator, flow actions are
//! interpreted here.
//!
//! # Action Types
//!
//! - Leaf actions: click, drag, type text, wait, template search, wait for text
//! - Data: set / increment variable, log
//! - Flow: conditional, loops (bounded, conditioned, for-each), nested and
//!   named sequences
//! - Advanced flow: switch/case, try/catch/finally, parallel groups, breakpoints
//!
//! # Key Types
//!
//! - [`ActionNode`] - A single node of a sequence tree
//! - [`ExecutionContext`] - Run-scoped state threaded through every node
//! - [`LeafActions`] - Collaborator that performs leaf actions
//! - [`SequenceExecutor`] - Executes and simulates action trees

pub mod action;
mod advanced;
pub mod context;
mod data;
pub mod error;
pub mod executor;
mod flow;
pub mod leaf;
pub mod progress;
pub mod sequence;

pub use action::{ActionKind, ActionNode, Leaf};
pub use context::{
    BreakpointHooks, ExecutionContext, LogSink, MatchResult, PauseOnBreakpoint, RunControl,
};
pub use error::{SequenceError, SequenceResult};
pub use executor::{SequenceExecutor, MAX_CALL_DEPTH};
pub use leaf::{LeafActions, LeafError, LeafOutcome};
pub use progress::ExecutionStats;
pub use sequence::{Sequence, SequenceConfig, SequenceLibrary, ValidationIssue};
