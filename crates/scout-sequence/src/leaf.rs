//! Leaf action collaborator contract
//!
//! Pointer, keyboard and vision primitives live outside the engine. The
//! executor forwards each leaf node to a [`LeafActions`] implementation and
//! writes the returned [`LeafOutcome`] into the execution context.
//!
//! Implementations that block (native input, screen capture) should move that
//! work onto `tokio::task::spawn_blocking` so a parallel branch only holds its
//! own worker slot.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::action::Leaf;
use crate::context::ExecutionContext;

/// A collaborator fault. Returning this is the equivalent of the collaborator
/// raising: the dispatcher converts it into a failure carrying the error text.
#[derive(Debug, Error)]
pub enum LeafError {
    #[error("{0}")]
    Backend(String),

    #[error("Invalid duration: {0}s")]
    InvalidDuration(f64),

    #[error("Unsupported action: {0}")]
    Unsupported(&'static str),
}

/// Convert a duration in seconds from a node payload, rejecting negative,
/// infinite and NaN values
pub fn duration_from_secs(secs: f64) -> Result<Duration, LeafError> {
    Duration::try_from_secs_f64(secs).map_err(|_| LeafError::InvalidDuration(secs))
}

/// Result of a leaf action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafOutcome {
    pub success: bool,
    pub message: String,

    /// Position of a template match
    pub match_position: Option<(i32, i32)>,

    /// Confidence of a template match
    pub match_confidence: Option<f64>,

    /// Text produced by text recognition
    pub recognized_text: Option<String>,
}

impl LeafOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_match(mut self, position: (i32, i32), confidence: f64) -> Self {
        self.match_position = Some(position);
        self.match_confidence = Some(confidence);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.recognized_text = Some(text.into());
        self
    }
}

/// Performs leaf actions on behalf of the executor
#[async_trait]
pub trait LeafActions: Send + Sync {
    /// Perform the action
    async fn execute(
        &self,
        leaf: Leaf<'_>,
        ctx: &ExecutionContext,
    ) -> Result<LeafOutcome, LeafError>;

    /// Describe the action without any observable side effect
    async fn simulate(
        &self,
        leaf: Leaf<'_>,
        _ctx: &ExecutionContext,
    ) -> Result<LeafOutcome, LeafError> {
        Ok(LeafOutcome::success(format!("Would {}", leaf.describe())))
    }
}
