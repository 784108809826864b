//! Execution context
//!
//! Mutable state threaded through every dispatched node. A context is created
//! by the caller once per run and stays owned by the caller afterwards; the
//! engine persists nothing.
//!
//! Scopes that need isolation (try blocks, parallel branches) run on a
//! [`fork`](ExecutionContext::fork) and are reconciled with
//! [`join`](ExecutionContext::join) when the scope exits. A fork remembers the
//! variables it started from, so joining writes back only the bindings the
//! scope changed. Forks share the [`RunControl`], log sink and breakpoint hooks
//! with their parent.

use scout_core::VariableStore;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use ulid::Ulid;

use crate::progress::ExecutionStats;

/// Receives one human-readable line per dispatch and per handler decision
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        self(line)
    }
}

/// Optional callbacks invoked when a breakpoint triggers outside simulation
pub trait BreakpointHooks: Send + Sync {
    fn on_breakpoint_hit(&self, _message: &str, _variables: &VariableStore) {}

    fn pause_execution(&self) {}
}

/// Stop and pause flags shared by every fork of a run
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    stopped: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to stop at the next step boundary
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Clear both flags before a new run
    pub fn reset(&self) {
        self.stopped.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }
}

/// Breakpoint hooks that pause the run until [`RunControl::resume`]
#[derive(Debug, Clone)]
pub struct PauseOnBreakpoint {
    control: RunControl,
}

impl PauseOnBreakpoint {
    pub fn new(control: RunControl) -> Self {
        Self { control }
    }
}

impl BreakpointHooks for PauseOnBreakpoint {
    fn pause_execution(&self) {
        self.control.pause();
    }
}

/// Last template match
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub position: (i32, i32),
    pub confidence: f64,
}

/// Mutable run-scoped state
#[derive(Clone)]
pub struct ExecutionContext {
    /// Variable store
    pub variables: VariableStore,

    /// Result of the last dispatched node
    pub last_result: bool,

    /// Message of the last dispatched node
    pub last_message: String,

    /// Last template match
    pub last_match: Option<MatchResult>,

    /// Last recognized text
    pub last_text: Option<String>,

    /// Simulate instead of execute
    pub simulation: bool,

    /// Delay between root-level steps
    pub step_delay: Duration,

    /// Restart the root list after a successful pass
    pub loop_enabled: bool,

    /// Statistics of the current run
    pub stats: ExecutionStats,

    pub(crate) call_depth: usize,

    /// Variables at fork time; `None` for a root context
    fork_base: Option<Arc<VariableStore>>,

    control: RunControl,
    log_sink: Option<Arc<dyn LogSink>>,
    hooks: Option<Arc<dyn BreakpointHooks>>,
    run_id: Ulid,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            variables: VariableStore::new(),
            last_result: true,
            last_message: String::new(),
            last_match: None,
            last_text: None,
            simulation: false,
            step_delay: Duration::ZERO,
            loop_enabled: false,
            stats: ExecutionStats::default(),
            call_depth: 0,
            fork_base: None,
            control: RunControl::new(),
            log_sink: None,
            hooks: None,
            run_id: Ulid::new(),
        }
    }

    pub fn with_variables(mut self, variables: VariableStore) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_log_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.log_sink = Some(Arc::new(sink));
        self
    }

    pub fn with_breakpoint_hooks(mut self, hooks: impl BreakpointHooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Share an externally held control handle
    pub fn with_control(mut self, control: RunControl) -> Self {
        self.control = control;
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn with_loop(mut self, enabled: bool) -> Self {
        self.loop_enabled = enabled;
        self
    }

    pub fn control(&self) -> &RunControl {
        &self.control
    }

    /// Request the run to stop
    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.control.is_stopped()
    }

    pub fn run_id(&self) -> Ulid {
        self.run_id
    }

    /// Start a new run identity; flags left over from an earlier run are cleared
    pub(crate) fn begin_run(&mut self) {
        self.run_id = Ulid::new();
        self.call_depth = 0;
        self.control.reset();
    }

    pub fn breakpoint_hooks(&self) -> Option<&Arc<dyn BreakpointHooks>> {
        self.hooks.as_ref()
    }

    /// Emit a line to tracing and to the caller's sink
    pub fn log(&self, line: impl AsRef<str>) {
        let line = line.as_ref();
        debug!(run_id = %self.run_id, "{}", line);
        if let Some(sink) = &self.log_sink {
            sink.log(line);
        }
    }

    /// Resolve `${name}` references against the variable store
    pub fn substitute(&self, text: &str) -> String {
        self.variables.substitute(text)
    }

    pub fn set_result(&mut self, success: bool, message: impl Into<String>) {
        self.last_result = success;
        self.last_message = message.into();
    }

    /// Isolated copy for a scope: same run, same control, cloned variables
    pub fn fork(&self) -> Self {
        let mut scope = self.clone();
        scope.fork_base = Some(Arc::new(self.variables.clone()));
        scope
    }

    /// Reconcile a finished scope: write back the variables it changed and
    /// adopt its last results
    pub fn join(&mut self, scope: ExecutionContext) {
        match &scope.fork_base {
            Some(base) => self.variables.merge_changes(base, scope.variables),
            None => self.variables.merge(scope.variables),
        }
        self.last_result = scope.last_result;
        self.last_message = scope.last_message;
        if scope.last_match.is_some() {
            self.last_match = scope.last_match;
        }
        if scope.last_text.is_some() {
            self.last_text = scope.last_text;
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("run_id", &self.run_id)
            .field("variables", &self.variables)
            .field("last_result", &self.last_result)
            .field("last_message", &self.last_message)
            .field("simulation", &self.simulation)
            .field("stopped", &self.control.is_stopped())
            .finish_non_exhaustive()
    }
}
