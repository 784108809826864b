//! Root configuration: engine settings plus the sequence library

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use scout_sequence::{SequenceConfig, SequenceLibrary};

use crate::error::{ConfigError, ConfigResult};
use crate::loader::YamlLoader;
use crate::settings::EngineSettings;

/// Root file name inside a config directory
pub const DEFAULT_CONFIG_FILE: &str = "scout.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    settings: EngineSettings,

    #[serde(default)]
    sequences: IndexMap<String, SequenceConfig>,
}

/// A loaded configuration directory
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    pub settings: EngineSettings,
    pub library: SequenceLibrary,
    /// Root file the configuration was read from
    pub source: PathBuf,
}

impl ScoutConfig {
    /// Load `file` from `config_dir`, resolving includes, secrets and env vars
    pub fn load(config_dir: impl Into<PathBuf>, file: impl AsRef<Path>) -> ConfigResult<Self> {
        let mut loader = YamlLoader::new(config_dir)?;
        let source = loader.config_dir().join(file.as_ref());
        let value = loader.load_file(file)?;
        Self::from_value(value, source)
    }

    /// Load `scout.yaml` from `config_dir`
    pub fn load_dir(config_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        Self::load(config_dir, DEFAULT_CONFIG_FILE)
    }

    fn from_value(value: serde_yaml::Value, source: PathBuf) -> ConfigResult<Self> {
        // An empty file is an empty configuration
        let raw: RawConfig = if value.is_null() {
            RawConfig::default()
        } else {
            serde_yaml::from_value(value).map_err(|err| ConfigError::Schema {
                path: source.clone(),
                source: err,
            })?
        };

        let library = SequenceLibrary::from_configs(raw.sequences);
        info!(
            path = %source.display(),
            sequences = library.len(),
            "Loaded configuration"
        );

        Ok(Self {
            settings: raw.settings,
            library,
            source,
        })
    }
}
