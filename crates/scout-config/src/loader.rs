//! YAML loader with include and substitution tags
//!
//! Supported tags:
//! - `!include path` - Replace the node with another YAML file
//! - `!include_dir_named dir` - Mapping of file stem to file content, one
//!   sequence per file
//! - `!include_dir_merge_list dir` - Concatenate the lists of every file
//! - `!secret key` - Text from `secrets.yaml`
//! - `!env_var NAME` - Text from an environment variable
//!
//! Relative paths resolve against the directory of the file that contains the
//! tag. Files in a directory include are read in name order.

use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::error::{ConfigError, ConfigResult};
use crate::secrets::Secrets;

/// YAML loader for one configuration directory
#[derive(Debug)]
pub struct YamlLoader {
    config_dir: PathBuf,
    secrets: Secrets,
    /// Files currently being loaded, outermost first
    include_stack: Vec<PathBuf>,
}

impl YamlLoader {
    /// Create a loader, reading `secrets.yaml` from `config_dir` if present
    pub fn new(config_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let config_dir = config_dir.into();
        let secrets = Secrets::load(&config_dir)?;
        Ok(Self::with_secrets(config_dir, secrets))
    }

    pub fn with_secrets(config_dir: impl Into<PathBuf>, secrets: Secrets) -> Self {
        Self {
            config_dir: config_dir.into(),
            secrets,
            include_stack: Vec::new(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load a file relative to the config directory and resolve its tags
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = self.config_dir.join(path.as_ref());
        self.load_resolved(path)
    }

    /// Parse YAML text and resolve its tags; includes resolve against `source`'s directory
    pub fn load_str(&mut self, content: &str, source: &Path) -> ConfigResult<Value> {
        let value: Value = serde_yaml::from_str(content).map_err(|err| ConfigError::ParseYaml {
            path: source.to_path_buf(),
            source: err,
        })?;
        self.resolve(value, source)
    }

    fn load_resolved(&mut self, path: PathBuf) -> ConfigResult<Value> {
        if self.include_stack.contains(&path) {
            let chain = self
                .include_stack
                .iter()
                .chain(std::iter::once(&path))
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ConfigError::CircularInclude { chain });
        }

        debug!(?path, "Loading YAML");
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;

        self.include_stack.push(path.clone());
        let result = self.load_str(&content, &path);
        self.include_stack.pop();
        result
    }

    fn resolve(&mut self, value: Value, source: &Path) -> ConfigResult<Value> {
        match value {
            Value::Tagged(tagged) => self.resolve_tag(*tagged, source),
            Value::Mapping(map) => {
                let mut resolved = Mapping::with_capacity(map.len());
                for (key, value) in map {
                    let value = self.resolve(value, source)?;
                    resolved.insert(key, value);
                }
                Ok(Value::Mapping(resolved))
            }
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| self.resolve(item, source))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Sequence),
            other => Ok(other),
        }
    }

    fn resolve_tag(&mut self, tagged: TaggedValue, source: &Path) -> ConfigResult<Value> {
        let tag = tagged.tag.to_string();
        trace!(%tag, "Resolving tag");

        match tag.as_str() {
            "!include" => {
                let path = self.tag_path("!include", &tagged.value, source)?;
                if !path.is_file() {
                    return Err(ConfigError::IncludeNotFound { path });
                }
                self.load_resolved(path)
            }
            "!include_dir_named" => {
                let dir = self.tag_path("!include_dir_named", &tagged.value, source)?;
                let mut named = Mapping::new();
                for file in yaml_files(&dir)? {
                    let stem = file
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or_default()
                        .to_string();
                    let content = self.load_resolved(file)?;
                    named.insert(Value::String(stem), content);
                }
                Ok(Value::Mapping(named))
            }
            "!include_dir_merge_list" => {
                let dir = self.tag_path("!include_dir_merge_list", &tagged.value, source)?;
                let mut merged = Vec::new();
                for file in yaml_files(&dir)? {
                    match self.load_resolved(file)? {
                        Value::Sequence(items) => merged.extend(items),
                        Value::Null => {}
                        single => merged.push(single),
                    }
                }
                Ok(Value::Sequence(merged))
            }
            "!secret" => {
                let key = tag_text("!secret", &tagged.value)?;
                let secret = self.secrets.get(key)?;
                debug!(key, "Substituted secret");
                Ok(Value::String(secret.to_string()))
            }
            "!env_var" => {
                let var = tag_text("!env_var", &tagged.value)?;
                let value = std::env::var(var).map_err(|_| ConfigError::EnvVarNotFound {
                    var: var.to_string(),
                })?;
                Ok(Value::String(value))
            }
            _ => {
                // Foreign tags pass through with their content resolved
                let value = self.resolve(tagged.value, source)?;
                Ok(Value::Tagged(Box::new(TaggedValue {
                    tag: tagged.tag,
                    value,
                })))
            }
        }
    }

    fn tag_path(&self, tag: &'static str, value: &Value, source: &Path) -> ConfigResult<PathBuf> {
        let text = tag_text(tag, value)?;
        let base = source.parent().unwrap_or(&self.config_dir);
        Ok(base.join(text))
    }
}

fn tag_text<'a>(tag: &'static str, value: &'a Value) -> ConfigResult<&'a str> {
    value.as_str().ok_or_else(|| ConfigError::InvalidTag {
        tag,
        reason: "expected a string".to_string(),
    })
}

/// `.yaml` / `.yml` files of a directory, sorted by name
fn yaml_files(dir: &Path) -> ConfigResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ConfigError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = fs::read_dir(dir).map_err(|source| ConfigError::ReadFile {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn get<'a>(value: &'a Value, key: &str) -> &'a Value {
        value.get(key).unwrap_or_else(|| panic!("missing key {}", key))
    }

    #[test]
    fn test_include_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "sub/inner.yaml", "x: 10\n");
        write(dir.path(), "sub/outer.yaml", "inner: !include inner.yaml\n");
        write(dir.path(), "root.yaml", "outer: !include sub/outer.yaml\n");

        let mut loader = YamlLoader::new(dir.path()).unwrap();
        let value = loader.load_file("root.yaml").unwrap();
        assert_eq!(get(get(get(&value, "outer"), "inner"), "x").as_i64(), Some(10));
    }

    #[test]
    fn test_include_missing_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "root.yaml", "a: !include nope.yaml\n");

        let mut loader = YamlLoader::new(dir.path()).unwrap();
        assert!(matches!(
            loader.load_file("root.yaml"),
            Err(ConfigError::IncludeNotFound { .. })
        ));
    }

    #[test]
    fn test_include_dir_named_and_merge_list() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "named/b_second.yaml", "k: 2\n");
        write(dir.path(), "named/a_first.yml", "k: 1\n");
        write(dir.path(), "named/notes.txt", "ignored");
        write(dir.path(), "steps/01.yaml", "- one\n- two\n");
        write(dir.path(), "steps/02.yaml", "- three\n");
        write(
            dir.path(),
            "root.yaml",
            "named: !include_dir_named named\nsteps: !include_dir_merge_list steps\n",
        );

        let mut loader = YamlLoader::new(dir.path()).unwrap();
        let value = loader.load_file("root.yaml").unwrap();

        let named = get(&value, "named").as_mapping().unwrap();
        let keys: Vec<&str> = named.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["a_first", "b_second"]);

        let steps = get(&value, "steps").as_sequence().unwrap();
        assert_eq!(steps.len(), 3);
    }

    #[test]
    fn test_secret_and_env_var() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "secrets.yaml", "login: scout_main\n");
        std::env::set_var("SCOUT_LOADER_TEST_REGION", "eu");
        write(
            dir.path(),
            "root.yaml",
            "login: !secret login\nregion: !env_var SCOUT_LOADER_TEST_REGION\n",
        );

        let mut loader = YamlLoader::new(dir.path()).unwrap();
        let value = loader.load_file("root.yaml").unwrap();
        assert_eq!(get(&value, "login").as_str(), Some("scout_main"));
        assert_eq!(get(&value, "region").as_str(), Some("eu"));
        std::env::remove_var("SCOUT_LOADER_TEST_REGION");

        write(dir.path(), "bad.yaml", "x: !secret unknown\n");
        assert!(matches!(
            loader.load_file("bad.yaml"),
            Err(ConfigError::SecretNotFound { .. })
        ));
    }

    #[test]
    fn test_circular_include_reports_chain() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.yaml", "b: !include b.yaml\n");
        write(dir.path(), "b.yaml", "a: !include a.yaml\n");

        let mut loader = YamlLoader::new(dir.path()).unwrap();
        match loader.load_file("a.yaml") {
            Err(ConfigError::CircularInclude { chain }) => {
                assert!(chain.contains("a.yaml -> "));
                assert!(chain.ends_with("a.yaml"));
            }
            other => panic!("expected circular include, got {:?}", other),
        }
    }
}
