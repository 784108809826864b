//! Configuration loading for Scout
//!
//! A config directory holds a root YAML file (`scout.yaml` by default) with two
//! sections:
//!
//! ```yaml
//! settings:
//!   step_delay_ms: 250
//!   loop_enabled: false
//! sequences:
//!   daily_rewards: !include sequences/daily.yaml
//!   login:
//!     actions:
//!       - type: type_text
//!         text: !secret account_password
//! ```
//!
//! Whole directories of sequences can be pulled in with
//! `sequences: !include_dir_named sequences`.

mod config;
mod error;
mod loader;
mod secrets;
mod settings;

pub use config::{ScoutConfig, DEFAULT_CONFIG_FILE};
pub use error::{ConfigError, ConfigResult};
pub use loader::YamlLoader;
pub use secrets::{Secrets, SECRETS_FILE};
pub use settings::EngineSettings;
