//! `secrets.yaml` lookup for `!secret` tags
//!
//! Typical secrets are account names or passwords that a sequence types into
//! the game client. Values are kept as text and never printed.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

pub const SECRETS_FILE: &str = "secrets.yaml";

/// Secrets loaded from `secrets.yaml`
#[derive(Clone, Default)]
pub struct Secrets {
    values: HashMap<String, String>,
    path: Option<PathBuf>,
}

impl Secrets {
    /// Load `secrets.yaml` from a config directory; a missing file yields no secrets
    pub fn load(config_dir: &Path) -> ConfigResult<Self> {
        let path = config_dir.join(SECRETS_FILE);
        if !path.is_file() {
            debug!(?path, "No secrets file");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let mut secrets = Self::parse(&content, &path)?;
        secrets.path = Some(path);
        Ok(secrets)
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        let raw: HashMap<String, serde_yaml::Value> =
            serde_yaml::from_str(content).map_err(|source| ConfigError::ParseYaml {
                path: path.to_path_buf(),
                source,
            })?;

        let values: HashMap<String, String> = raw
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Null => String::new(),
                    // Nested structures are not typeable text
                    _ => return None,
                };
                Some((key, text))
            })
            .collect();

        debug!(count = values.len(), "Loaded secrets");
        Ok(Self { values, path: None })
    }

    pub fn get(&self, key: &str) -> ConfigResult<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::SecretNotFound {
                key: key.to_string(),
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Path the secrets were read from, if a file existed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Secrets")
            .field("keys", &keys)
            .field("path", &self.path)
            .finish()
    }
}
