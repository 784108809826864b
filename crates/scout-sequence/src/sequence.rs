//! Sequence definitions
//!
//! A Sequence is a named, ordered list of actions. Sequences are collected in a
//! [`SequenceLibrary`] so that `call_sequence` nodes and the `run` entry point
//! can find them by name.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::action::{ActionKind, ActionNode};
use crate::error::SequenceError;

/// Sequence configuration from YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Action list
    #[serde(default)]
    pub actions: Vec<ActionNode>,
}

/// A loaded sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    /// Sequence name (library key)
    pub name: String,

    /// Description
    pub description: Option<String>,

    /// Root action list
    pub actions: Vec<ActionNode>,
}

impl Sequence {
    /// Create from config
    pub fn from_config(name: impl Into<String>, config: SequenceConfig) -> Self {
        Self {
            name: name.into(),
            description: config.description,
            actions: config.actions,
        }
    }

    pub fn new(name: impl Into<String>, actions: Vec<ActionNode>) -> Self {
        Self {
            name: name.into(),
            description: None,
            actions,
        }
    }

    /// Total number of nodes in the tree
    pub fn node_count(&self) -> usize {
        fn count(actions: &[ActionNode]) -> usize {
            actions
                .iter()
                .map(|node| 1 + node.children().into_iter().map(count).sum::<usize>())
                .sum()
        }
        count(&self.actions)
    }
}

/// A problem found by [`SequenceLibrary::check`]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    /// Sequence name
    pub sequence: String,

    /// Node path, e.g. `actions[2].children[0][1]`
    pub path: String,

    /// Kind of the offending node
    pub kind: &'static str,

    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}): {}",
            self.sequence, self.path, self.kind, self.message
        )
    }
}

/// Named sequences, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceLibrary {
    sequences: IndexMap<String, Sequence>,
}

impl SequenceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library from name → config pairs
    pub fn from_configs(configs: impl IntoIterator<Item = (String, SequenceConfig)>) -> Self {
        configs
            .into_iter()
            .map(|(name, config)| Sequence::from_config(name, config))
            .collect()
    }

    /// Add a sequence, replacing any previous one with the same name
    pub fn insert(&mut self, sequence: Sequence) -> Option<Sequence> {
        self.sequences.insert(sequence.name.clone(), sequence)
    }

    pub fn get(&self, name: &str) -> Option<&Sequence> {
        self.sequences.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sequences.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sequences.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.values()
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Validate every enabled node of every sequence and resolve
    /// `call_sequence` targets against this library
    pub fn check(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for sequence in self.sequences.values() {
            self.check_list(&sequence.name, "actions", &sequence.actions, &mut issues);
        }
        issues
    }

    fn check_list(
        &self,
        sequence: &str,
        prefix: &str,
        actions: &[ActionNode],
        issues: &mut Vec<ValidationIssue>,
    ) {
        for (index, node) in actions.iter().enumerate() {
            if !node.enabled {
                continue;
            }

            let path = format!("{}[{}]", prefix, index);
            let mut report = |message: String| {
                issues.push(ValidationIssue {
                    sequence: sequence.to_string(),
                    path: path.clone(),
                    kind: node.kind.name(),
                    message,
                })
            };

            match node.validate() {
                Err(SequenceError::Invalid(reason)) => report(reason),
                Err(other) => report(other.to_string()),
                Ok(()) => {}
            }
            if let ActionKind::CallSequence(p) = &node.kind {
                let target = p.name.trim();
                if !target.is_empty() && !self.contains(target) {
                    report(format!("unknown sequence '{}'", target));
                }
            }

            for (child, list) in node.children().into_iter().enumerate() {
                let prefix = format!("{}.children[{}]", path, child);
                self.check_list(sequence, &prefix, list, issues);
            }
        }
    }
}

impl FromIterator<Sequence> for SequenceLibrary {
    fn from_iter<I: IntoIterator<Item = Sequence>>(iter: I) -> Self {
        let mut library = Self::new();
        for sequence in iter {
            library.insert(sequence);
        }
        library
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY_YAML: &str = r#"
daily:
  description: Collect daily rewards
  actions:
    - type: click
      x: 10
      y: 20
    - type: call_sequence
      name: close_popups
close_popups:
  actions:
    - type: loop
      mode: bounded
      count: 2
      actions:
        - type: template_search
          template_path: close.png
broken:
  actions:
    - type: conditional
      then_actions:
        - type: type_text
    - type: call_sequence
      name: missing
    - type: wait
      enabled: false
"#;

    fn library() -> SequenceLibrary {
        let configs: IndexMap<String, SequenceConfig> =
            serde_yaml::from_str(LIBRARY_YAML).unwrap();
        SequenceLibrary::from_configs(configs)
    }

    #[test]
    fn test_library_preserves_order() {
        let library = library();
        let names: Vec<&str> = library.names().collect();
        assert_eq!(names, vec!["daily", "close_popups", "broken"]);
        assert_eq!(
            library.get("daily").unwrap().description.as_deref(),
            Some("Collect daily rewards")
        );
    }

    #[test]
    fn test_node_count_includes_nested() {
        let library = library();
        assert_eq!(library.get("close_popups").unwrap().node_count(), 2);
        assert_eq!(library.get("broken").unwrap().node_count(), 4);
    }

    #[test]
    fn test_check_reports_nested_and_unknown_calls() {
        let issues = library().check();
        let paths: Vec<(&str, &str)> = issues
            .iter()
            .map(|issue| (issue.sequence.as_str(), issue.path.as_str()))
            .collect();

        assert_eq!(
            paths,
            vec![
                ("broken", "actions[0]"),
                ("broken", "actions[0].children[0][0]"),
                ("broken", "actions[1]"),
            ]
        );
        assert!(issues[2].message.contains("missing"));
    }
}
