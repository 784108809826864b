//! Engine settings from the `settings:` block

use serde::{Deserialize, Serialize};
use std::time::Duration;

use scout_sequence::ExecutionContext;

fn default_step_delay_ms() -> u64 {
    500
}

/// Run defaults applied to every execution context built from a config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSettings {
    /// Pause between root-level steps, in milliseconds
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,

    /// Restart the root list after every successful pass
    #[serde(default)]
    pub loop_enabled: bool,

    /// Simulate instead of executing
    #[serde(default)]
    pub simulate: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            step_delay_ms: default_step_delay_ms(),
            loop_enabled: false,
            simulate: false,
        }
    }
}

impl EngineSettings {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    /// A fresh execution context carrying these settings
    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new()
            .with_step_delay(self.step_delay())
            .with_loop(self.loop_enabled)
    }
}
