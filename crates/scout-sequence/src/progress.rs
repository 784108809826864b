//! Run statistics

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Counters for the root-level steps of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionStats {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_actions: usize,
    pub completed_actions: usize,
    pub successful_actions: usize,
    pub failed_actions: usize,
}

impl ExecutionStats {
    /// Begin tracking a run of `total_actions` root steps
    pub fn start(total_actions: usize) -> Self {
        Self {
            started_at: Some(Utc::now()),
            total_actions,
            ..Default::default()
        }
    }

    pub fn record(&mut self, success: bool) {
        self.completed_actions += 1;
        if success {
            self.successful_actions += 1;
        } else {
            self.failed_actions += 1;
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn is_complete(&self) -> bool {
        self.completed_actions >= self.total_actions
    }

    /// Percentage of completed steps that succeeded
    pub fn success_rate(&self) -> f64 {
        if self.completed_actions == 0 {
            return 0.0;
        }
        self.successful_actions as f64 / self.completed_actions as f64 * 100.0
    }

    pub fn progress_percentage(&self) -> f64 {
        if self.total_actions == 0 {
            return 100.0;
        }
        (self.completed_actions as f64 / self.total_actions as f64 * 100.0).min(100.0)
    }

    /// Seconds between start and finish (or now, while running)
    pub fn elapsed_secs(&self) -> f64 {
        let Some(started) = self.started_at else {
            return 0.0;
        };
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - started).num_milliseconds() as f64 / 1000.0
    }
}

impl fmt::Display for ExecutionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} actions, {:.1}% success rate, {:.1}s elapsed",
            self.completed_actions,
            self.total_actions,
            self.success_rate(),
            self.elapsed_secs()
        )
    }
}
