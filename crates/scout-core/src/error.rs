//! Error types for value conversion

use thiserror::Error;

/// Result type for value conversions
pub type ValueResult<T> = Result<T, ValueError>;

/// Errors raised when a value cannot be read as the requested type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("'{0}' is not a number")]
    NotNumeric(String),

    #[error("'{0}' is not a boolean")]
    NotBoolean(String),

    #[error("'{0}' is not a list")]
    NotList(String),
}
