//! Variable store
//!
//! A name to value map owned by an execution scope. Scopes that need isolation
//! (try blocks, parallel branches) work on a clone and hand back only what they
//! changed at the scope exit, see [`VariableStore::merge_changes`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::expression;
use crate::value::Value;

/// Mapping of variable names to values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableStore {
    vars: HashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a variable
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Set a variable, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    /// Copy every binding of `other` into this store, overwriting on conflict
    pub fn merge(&mut self, other: VariableStore) {
        self.vars.extend(other.vars);
    }

    /// Apply what `scope` changed relative to `base`, the snapshot it started
    /// from: new or rebound names are written, names `scope` dropped are removed.
    /// Bindings `scope` left untouched are not written, so a concurrent scope's
    /// update to them survives.
    pub fn merge_changes(&mut self, base: &VariableStore, scope: VariableStore) {
        for name in base.vars.keys() {
            if !scope.contains(name) {
                self.remove(name);
            }
        }
        for (name, value) in scope.vars {
            if base.get(&name) != Some(&value) {
                self.vars.insert(name, value);
            }
        }
    }

    /// Variable names in sorted order (stable output for logs and hooks)
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.vars.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve `${name}` references against this store
    pub fn substitute(&self, text: &str) -> String {
        expression::substitute(text, self)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VariableStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
