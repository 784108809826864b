//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading a configuration directory
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The YAML parsed but does not describe settings and sequences
    #[error("invalid configuration in {path}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("secret '{key}' not found in secrets.yaml")]
    SecretNotFound { key: String },

    #[error("invalid value for {tag}: {reason}")]
    InvalidTag { tag: &'static str, reason: String },

    #[error("included file not found: {path}")]
    IncludeNotFound { path: PathBuf },

    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("circular include: {chain}")]
    CircularInclude { chain: String },

    #[error("environment variable '{var}' not set")]
    EnvVarNotFound { var: String },
}
