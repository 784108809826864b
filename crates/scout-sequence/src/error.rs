//! Sequence execution errors

use scout_condition::ConditionError;
use scout_core::ValueError;
use thiserror::Error;

use crate::leaf::LeafError;

/// Sequence execution errors
///
/// Every variant is an ordinary failure result: the public entry points turn
/// it into `false` plus its message on the execution context.
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("Action is disabled")]
    Disabled,

    #[error("Invalid action parameters: {0}")]
    Invalid(String),

    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),

    #[error("Variable error: {0}")]
    Value(#[from] ValueError),

    #[error("Variable '{0}' not found")]
    UnknownVariable(String),

    /// Collaborator reported failure
    #[error("{0}")]
    Failed(String),

    /// Collaborator raised
    #[error("Error executing action: {0}")]
    Fault(#[from] LeafError),

    #[error("Execution stopped")]
    Stopped,

    #[error("Reached maximum iterations ({0})")]
    MaxIterations(u32),

    #[error("Unknown sequence: {0}")]
    UnknownSequence(String),

    #[error("Sequence call depth exceeded ({0})")]
    RecursionLimit(usize),

    #[error("Parallel branch {index} failed: {message}")]
    BranchFailed { index: usize, message: String },

    #[error("{failed} of {total} parallel branches failed: {message}")]
    BranchesFailed {
        failed: usize,
        total: usize,
        message: String,
    },
}

/// Result type for sequence execution
pub type SequenceResult<T> = Result<T, SequenceError>;
