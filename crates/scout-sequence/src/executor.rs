//! Sequence executor
//!
//! Walks a tree of [`ActionNode`]s against an [`ExecutionContext`]. Every node
//! goes through `dispatch`: validation, a log line, then
//! either the leaf collaborator or one of the flow handlers in `flow` and
//! `advanced`. Handlers recurse into nested lists through the same dispatcher.
//!
//! Internally everything returns [`SequenceResult`]; the public entry points
//! fold that into `bool` and leave the message in `ctx.last_message`.

use futures::future::{BoxFuture, FutureExt};
use scout_condition::ConditionEvaluator;
use scout_core::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::action::{ActionKind, ActionNode, Leaf};
use crate::context::{ExecutionContext, MatchResult};
use crate::error::{SequenceError, SequenceResult};
use crate::leaf::{LeafActions, LeafOutcome};
use crate::progress::ExecutionStats;
use crate::sequence::SequenceLibrary;

/// Maximum nesting of `call_sequence`
pub const MAX_CALL_DEPTH: usize = 32;

/// How often a paused run re-checks its flags
const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Sequence executor
///
/// Cheap to clone; parallel branches run on clones.
#[derive(Clone)]
pub struct SequenceExecutor {
    leaf: Arc<dyn LeafActions>,
    library: Arc<SequenceLibrary>,
    pub(crate) evaluator: ConditionEvaluator,
}

impl SequenceExecutor {
    /// Create an executor that forwards leaf actions to `leaf`
    pub fn new(leaf: Arc<dyn LeafActions>) -> Self {
        Self {
            leaf,
            library: Arc::new(SequenceLibrary::new()),
            evaluator: ConditionEvaluator::new(),
        }
    }

    /// Named sequences reachable through `call_sequence`
    pub fn with_library(mut self, library: SequenceLibrary) -> Self {
        self.library = Arc::new(library);
        self
    }

    pub fn library(&self) -> &SequenceLibrary {
        &self.library
    }

    /// Execute a single node
    pub async fn execute(&self, node: &ActionNode, ctx: &mut ExecutionContext) -> bool {
        ctx.simulation = false;
        self.dispatch(node, ctx).await.is_ok()
    }

    /// Simulate a single node: same control flow, no leaf side effects
    pub async fn simulate(&self, node: &ActionNode, ctx: &mut ExecutionContext) -> bool {
        ctx.simulation = true;
        self.dispatch(node, ctx).await.is_ok()
    }

    /// Run a root action list
    ///
    /// Disabled root steps are skipped. The first failing step halts the run.
    /// With `ctx.loop_enabled` the list restarts after each successful pass
    /// until it fails or the run is stopped. Stop the run from elsewhere with
    /// `ctx.control().stop()` on a shared [`RunControl`]. Stop and pause flags
    /// are cleared when the run starts, so a context can be reused.
    ///
    /// [`RunControl`]: crate::context::RunControl
    pub async fn run(
        &self,
        actions: &[ActionNode],
        ctx: &mut ExecutionContext,
        simulate: bool,
    ) -> bool {
        ctx.begin_run();
        ctx.simulation = simulate;

        let enabled = actions.iter().filter(|node| node.enabled).count();
        ctx.stats = ExecutionStats::start(enabled);

        info!(
            run_id = %ctx.run_id(),
            steps = actions.len(),
            simulate,
            "Starting run"
        );
        ctx.log(format!(
            "Starting run of {} steps (Loop: {})",
            actions.len(),
            if ctx.loop_enabled { "ON" } else { "OFF" }
        ));

        let success = loop {
            match self.run_pass(actions, ctx).await {
                Ok(()) if ctx.loop_enabled && enabled > 0 && !ctx.is_stopped() => {
                    ctx.log("Sequence completed - restarting due to loop enabled");
                    ctx.stats.total_actions += enabled;
                    if !ctx.step_delay.is_zero() {
                        tokio::time::sleep(ctx.step_delay).await;
                    }
                }
                Ok(()) => break true,
                Err(err) => {
                    ctx.log(format!("ERROR: {}", err));
                    break false;
                }
            }
        };

        ctx.stats.finish();
        ctx.last_result = success;
        ctx.log(format!("Run finished: {}", ctx.stats));
        info!(run_id = %ctx.run_id(), success, stats = %ctx.stats, "Run finished");

        success
    }

    /// Run a named sequence from the library
    pub async fn run_sequence(
        &self,
        name: &str,
        ctx: &mut ExecutionContext,
        simulate: bool,
    ) -> bool {
        match self.library.get(name) {
            Some(sequence) => {
                ctx.log(format!("Starting sequence: {}", sequence.name));
                self.run(&sequence.actions, ctx, simulate).await
            }
            None => {
                let err = SequenceError::UnknownSequence(name.to_string());
                ctx.log(format!("ERROR: {}", err));
                ctx.set_result(false, err.to_string());
                false
            }
        }
    }

    async fn run_pass(
        &self,
        actions: &[ActionNode],
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let mut first = true;
        for (index, node) in actions.iter().enumerate() {
            self.checkpoint(ctx).await?;

            if !node.enabled {
                ctx.log(format!(
                    "Skipping disabled step {}: {}",
                    index + 1,
                    node.kind.name()
                ));
                continue;
            }

            if !first && !ctx.step_delay.is_zero() {
                tokio::time::sleep(ctx.step_delay).await;
            }
            first = false;

            ctx.log(format!(
                "Step {}/{}: {}",
                index + 1,
                actions.len(),
                node.kind.name()
            ));
            let result = self.dispatch(node, ctx).await;
            ctx.stats.record(result.is_ok());
            result?;
        }
        Ok(())
    }

    /// Validate, log and dispatch one node, recording its result on the context
    pub(crate) fn dispatch<'a>(
        &'a self,
        node: &'a ActionNode,
        ctx: &'a mut ExecutionContext,
    ) -> BoxFuture<'a, SequenceResult<()>> {
        async move {
            let kind = node.kind.name();

            if let Err(err) = node.validate() {
                ctx.log(format!("Invalid action parameters: {}: {}", kind, err));
                ctx.set_result(false, err.to_string());
                return Err(err);
            }

            let mode = if ctx.simulation { "Simulating" } else { "Executing" };
            let description = if node.description.is_empty() {
                "No description"
            } else {
                node.description.as_str()
            };
            ctx.log(format!("{} {}: {}", mode, kind, description));

            let result = match &node.kind {
                ActionKind::Click(p) => self.run_leaf(Leaf::Click(p), ctx).await,
                ActionKind::Drag(p) => self.run_leaf(Leaf::Drag(p), ctx).await,
                ActionKind::TypeText(p) => self.run_leaf(Leaf::TypeText(p), ctx).await,
                ActionKind::Wait(p) => self.run_leaf(Leaf::Wait(p), ctx).await,
                ActionKind::TemplateSearch(p) => {
                    self.run_leaf(Leaf::TemplateSearch(p), ctx).await
                }
                ActionKind::WaitForText(p) => self.run_leaf(Leaf::WaitForText(p), ctx).await,
                ActionKind::SetVariable(p) => self.set_variable(p, ctx),
                ActionKind::IncrementVariable(p) => self.increment_variable(p, ctx),
                ActionKind::Log(p) => self.log_message(p, ctx),
                ActionKind::StringOperation(p) => self.string_operation(p, ctx),
                ActionKind::ListOperation(p) => self.list_operation(p, ctx),
                ActionKind::MathOperation(p) => self.math_operation(p, ctx),
                ActionKind::Conditional(p) => self.run_conditional(p, ctx).await,
                ActionKind::Loop(p) => self.run_loop(p, ctx).await,
                ActionKind::Sequence(p) => self.run_nested_sequence(&p.actions, ctx).await,
                ActionKind::CallSequence(p) => self.call_sequence(&p.name, ctx).await,
                ActionKind::SwitchCase(p) => self.run_switch(p, ctx).await,
                ActionKind::TryCatch(p) => self.run_try_catch(p, ctx).await,
                ActionKind::Parallel(p) => self.run_parallel(p, ctx).await,
                ActionKind::Breakpoint(p) => self.run_breakpoint(p, ctx),
            };

            match &result {
                Ok(()) => ctx.last_result = true,
                Err(err) => ctx.set_result(false, err.to_string()),
            }
            result
        }
        .boxed()
    }

    /// Execute an ordered list, failing fast and polling stop/pause between nodes
    pub(crate) async fn execute_list(
        &self,
        actions: &[ActionNode],
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        for node in actions {
            if let Err(err) = self.checkpoint(ctx).await {
                ctx.log("Execution stopped");
                return Err(err);
            }
            self.dispatch(node, ctx).await?;
        }
        Ok(())
    }

    /// Wait while paused, then fail if the run was stopped
    pub(crate) async fn checkpoint(&self, ctx: &ExecutionContext) -> SequenceResult<()> {
        let control = ctx.control();
        if control.is_paused() && !control.is_stopped() {
            ctx.log("Execution paused");
            while control.is_paused() && !control.is_stopped() {
                tokio::time::sleep(PAUSE_POLL_INTERVAL).await;
            }
            if !control.is_stopped() {
                ctx.log("Execution resumed");
            }
        }

        if control.is_stopped() {
            return Err(SequenceError::Stopped);
        }
        Ok(())
    }

    /// Forward a leaf action to the collaborator and write its outcome back
    async fn run_leaf(&self, leaf: Leaf<'_>, ctx: &mut ExecutionContext) -> SequenceResult<()> {
        let outcome = if ctx.simulation {
            self.leaf.simulate(leaf, ctx).await
        } else {
            self.leaf.execute(leaf, ctx).await
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(run_id = %ctx.run_id(), error = %err, "Leaf action raised");
                let err = SequenceError::Fault(err);
                ctx.log(err.to_string());
                return Err(err);
            }
        };

        if let Some(position) = outcome.match_position {
            ctx.last_match = Some(MatchResult {
                position,
                confidence: outcome.match_confidence.unwrap_or(0.0),
            });
        }
        if let Some(text) = &outcome.recognized_text {
            ctx.last_text = Some(text.clone());
        }

        if outcome.success {
            self.save_leaf_result(leaf, &outcome, ctx);
        }

        let message = if outcome.message.is_empty() && !outcome.success {
            format!("{} failed", leaf.describe())
        } else {
            outcome.message
        };
        ctx.log(&message);
        ctx.set_result(outcome.success, message.clone());

        if outcome.success {
            Ok(())
        } else {
            Err(SequenceError::Failed(message))
        }
    }

    fn save_leaf_result(
        &self,
        leaf: Leaf<'_>,
        outcome: &LeafOutcome,
        ctx: &mut ExecutionContext,
    ) {
        let (name, value) = match leaf {
            Leaf::TemplateSearch(p) => {
                let Some((x, y)) = outcome.match_position else {
                    return;
                };
                (
                    p.save_to_variable.as_deref(),
                    Value::List(vec![Value::from(x), Value::from(y)]),
                )
            }
            Leaf::WaitForText(p) => {
                let text = outcome
                    .recognized_text
                    .clone()
                    .unwrap_or_else(|| p.text.clone());
                (p.save_to_variable.as_deref(), Value::String(text))
            }
            _ => return,
        };

        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            ctx.log(format!("Saved result to variable '{}': {}", name, value));
            ctx.variables.set(name, value);
        }
    }
}
