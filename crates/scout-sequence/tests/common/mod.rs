//! Shared test utilities for engine integration tests
//!
//! - [`RecordingLeafActions`]: collaborator that records every call
//! - [`LogCapture`]: log sink that keeps every line
//! - node builders from JSON

#![allow(dead_code)]

use async_trait::async_trait;
use scout_sequence::leaf::duration_from_secs;
use scout_sequence::{ActionNode, ExecutionContext, Leaf, LeafActions, LeafError, LeafOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Collaborator with scripted behavior:
///
/// - `click` with a negative `x` reports failure
/// - `type_text` with text `"raise"` returns an error
/// - `wait` sleeps for its duration
/// - `template_search` for `missing.png` fails, otherwise matches at (320, 240)
/// - `wait_for_text` recognizes exactly the requested text
#[derive(Default)]
pub struct RecordingLeafActions {
    executed: Mutex<Vec<String>>,
    simulated: Mutex<Vec<String>>,
    active_waits: AtomicUsize,
    max_concurrent_waits: AtomicUsize,
}

impl RecordingLeafActions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn simulated(&self) -> Vec<String> {
        self.simulated.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.executed()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn max_concurrent_waits(&self) -> usize {
        self.max_concurrent_waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeafActions for RecordingLeafActions {
    async fn execute(
        &self,
        leaf: Leaf<'_>,
        _ctx: &ExecutionContext,
    ) -> Result<LeafOutcome, LeafError> {
        self.executed.lock().unwrap().push(leaf.describe());

        match leaf {
            Leaf::Click(p) if p.x < 0 => Ok(LeafOutcome::failure(format!(
                "Click at ({}, {}) is off screen",
                p.x, p.y
            ))),
            Leaf::TypeText(p) if p.text == "raise" => {
                Err(LeafError::Backend("keyboard unavailable".to_string()))
            }
            Leaf::Wait(p) => {
                let duration = duration_from_secs(p.duration)?;
                let active = self.active_waits.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_concurrent_waits.fetch_max(active, Ordering::SeqCst);
                tokio::time::sleep(duration).await;
                self.active_waits.fetch_sub(1, Ordering::SeqCst);
                Ok(LeafOutcome::success(format!("Waited {}s", p.duration)))
            }
            Leaf::TemplateSearch(p) if p.template_path == "missing.png" => {
                Ok(LeafOutcome::failure("Template not found"))
            }
            Leaf::TemplateSearch(_) => {
                Ok(LeafOutcome::success("Template found").with_match((320, 240), 0.93))
            }
            Leaf::WaitForText(p) => {
                Ok(LeafOutcome::success("Text found").with_text(p.text.clone()))
            }
            _ => Ok(LeafOutcome::success(leaf.describe())),
        }
    }

    async fn simulate(
        &self,
        leaf: Leaf<'_>,
        _ctx: &ExecutionContext,
    ) -> Result<LeafOutcome, LeafError> {
        self.simulated.lock().unwrap().push(leaf.describe());
        Ok(LeafOutcome::success(format!("Would {}", leaf.describe())))
    }
}

/// Log sink that keeps every line
#[derive(Clone, Default)]
pub struct LogCapture {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.lines()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl scout_sequence::LogSink for LogCapture {
    fn log(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// Build a node from its serialized form
pub fn node(config: serde_json::Value) -> ActionNode {
    serde_json::from_value(config).unwrap_or_else(|e| panic!("Invalid test node: {}", e))
}

/// Build an action list from a JSON array
pub fn nodes(config: serde_json::Value) -> Vec<ActionNode> {
    serde_json::from_value(config).unwrap_or_else(|e| panic!("Invalid test nodes: {}", e))
}

/// Context wired to a fresh log capture
pub fn context() -> (ExecutionContext, LogCapture) {
    let logs = LogCapture::new();
    let ctx = ExecutionContext::new().with_log_sink(logs.clone());
    (ctx, logs)
}
