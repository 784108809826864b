//! Advanced flow handlers: switch/case, try/catch/finally, parallel groups and
//! breakpoints
//!
//! # Scope isolation
//!
//! Try blocks and parallel branches run on a fork of the context. A try scope
//! is joined back after `finally` runs, whatever the outcome. Parallel
//! branches are joined when they complete: every branch in `wait_for_all` mode
//! (in completion order), only the winning branch in race mode.

use scout_core::parse_value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::action::{
    ActionNode, BreakpointParams, ParallelParams, SwitchCaseParams, TryCatchParams,
};
use crate::context::ExecutionContext;
use crate::error::{SequenceError, SequenceResult};
use crate::executor::SequenceExecutor;

const DEFAULT_BREAKPOINT_MESSAGE: &str = "Breakpoint reached";

/// Outcome of one parallel branch
struct BranchResult {
    index: usize,
    outcome: SequenceResult<()>,
    scope: ExecutionContext,
}

impl SequenceExecutor {
    pub(crate) async fn run_switch(
        &self,
        params: &SwitchCaseParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let value = parse_value(&ctx.substitute(&params.expression));
        ctx.log(format!("Switch expression evaluated to: {}", value));

        for (index, case) in params.cases.iter().enumerate() {
            let case_value = parse_value(&ctx.substitute(&case.value.to_string()));
            if value.loose_eq(&case_value) {
                ctx.log(format!("Matched case {}: {}", index + 1, case_value));
                return self.execute_list(&case.actions, ctx).await;
            }
        }

        if params.default_actions.is_empty() {
            ctx.log("No case matched and no default actions");
            return Ok(());
        }

        ctx.log("No case matched, executing default actions");
        self.execute_list(&params.default_actions, ctx).await
    }

    pub(crate) async fn run_try_catch(
        &self,
        params: &TryCatchParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let mut scope = ctx.fork();

        ctx.log("Executing try block");
        let try_result = self.execute_list(&params.try_actions, &mut scope).await;
        let mut outcome = match try_result {
            Ok(()) => Ok(()),
            Err(SequenceError::Stopped) => {
                ctx.join(scope);
                return Err(SequenceError::Stopped);
            }
            Err(err) => {
                let message = err.to_string();
                ctx.log(format!("Try block failed: {}", message));

                if params.catch_actions.is_empty() {
                    Err(err)
                } else {
                    if let Some(name) = params
                        .store_error_variable
                        .as_deref()
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                    {
                        ctx.log(format!("Stored error in variable '{}'", name));
                        scope.variables.set(name, message);
                    }
                    ctx.log("Executing catch block");
                    self.execute_list(&params.catch_actions, &mut scope).await
                }
            }
        };

        let stopped = matches!(outcome, Err(SequenceError::Stopped));
        if !params.finally_actions.is_empty() && !stopped {
            ctx.log("Executing finally block");
            if let Err(err) = self.execute_list(&params.finally_actions, &mut scope).await {
                ctx.log(format!("Finally block failed: {}", err));
                if outcome.is_ok() {
                    outcome = Err(err);
                }
            }
        }

        // Merge-always: the scope's variables survive a failing finally
        ctx.join(scope);
        outcome
    }

    pub(crate) async fn run_parallel(
        &self,
        params: &ParallelParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let total = params.branches.len();
        ctx.log(format!(
            "Starting parallel execution of {} branches (max_workers={}, wait_for_all={})",
            total, params.max_workers, params.wait_for_all
        ));

        let mut branches = self.spawn_branches(&params.branches, params.max_workers, ctx);

        let result = if params.wait_for_all {
            self.join_all(&mut branches, total, ctx).await
        } else {
            self.join_first(&mut branches, ctx).await
        };

        if ctx.is_stopped() {
            return Err(SequenceError::Stopped);
        }
        result
    }

    /// Spawn one task per branch; each waits for a worker permit before running
    fn spawn_branches(
        &self,
        branches: &[Vec<ActionNode>],
        max_workers: usize,
        ctx: &ExecutionContext,
    ) -> JoinSet<BranchResult> {
        let workers = Arc::new(Semaphore::new(max_workers));
        let mut set = JoinSet::new();

        for (index, actions) in branches.iter().enumerate() {
            let executor = self.clone();
            let actions = actions.clone();
            let workers = workers.clone();
            let mut scope = ctx.fork();

            set.spawn(async move {
                let Ok(_permit) = workers.acquire_owned().await else {
                    return BranchResult {
                        index,
                        outcome: Err(SequenceError::Stopped),
                        scope,
                    };
                };

                debug!(branch = index, "Parallel branch started");
                let outcome = executor.execute_list(&actions, &mut scope).await;
                BranchResult {
                    index,
                    outcome,
                    scope,
                }
            });
        }

        set
    }

    async fn join_all(
        &self,
        branches: &mut JoinSet<BranchResult>,
        total: usize,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let mut failures = Vec::new();

        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok(branch) => {
                    let succeeded = branch.outcome.is_ok();
                    ctx.log(format!(
                        "Branch {} completed: {}",
                        branch.index + 1,
                        if succeeded { "success" } else { "failed" }
                    ));
                    if let Err(err) = branch.outcome {
                        failures.push(format!("branch {}: {}", branch.index + 1, err));
                    }
                    ctx.join(branch.scope);
                }
                Err(err) => {
                    // Panicked or cancelled; its scope is lost
                    warn!(error = %err, "Parallel branch aborted");
                    ctx.log(format!("Branch aborted: {}", err));
                    failures.push(format!("aborted: {}", err));
                }
            }
        }

        ctx.log(format!(
            "Parallel execution complete: {}/{} branches succeeded",
            total - failures.len(),
            total
        ));

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SequenceError::BranchesFailed {
                failed: failures.len(),
                total,
                message: failures.join("; "),
            })
        }
    }

    async fn join_first(
        &self,
        branches: &mut JoinSet<BranchResult>,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let first = branches.join_next().await;
        // Queued branches never start; running ones stop at their next await
        branches.abort_all();

        match first {
            Some(Ok(branch)) => {
                ctx.log(format!(
                    "Branch {} finished first: {}",
                    branch.index + 1,
                    if branch.outcome.is_ok() { "success" } else { "failed" }
                ));
                let index = branch.index;
                let outcome = branch.outcome;
                ctx.join(branch.scope);
                outcome.map_err(|err| SequenceError::BranchFailed {
                    index: index + 1,
                    message: err.to_string(),
                })
            }
            Some(Err(err)) => {
                warn!(error = %err, "Parallel branch aborted");
                ctx.log(format!("Branch aborted: {}", err));
                Err(SequenceError::Failed(format!(
                    "Parallel branch aborted: {}",
                    err
                )))
            }
            None => Ok(()),
        }
    }

    /// Breakpoints never fail
    pub(crate) fn run_breakpoint(
        &self,
        params: &BreakpointParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let triggered = match params.condition.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(condition) => match self.evaluator.evaluate(condition, &ctx.variables) {
                Ok(result) => {
                    ctx.log(format!("Breakpoint condition evaluated to: {}", result));
                    result
                }
                Err(err) => {
                    ctx.log(format!("Breakpoint condition error: {}", err));
                    false
                }
            },
        };

        if !triggered {
            ctx.log("Breakpoint condition not met, continuing execution");
            return Ok(());
        }

        let message = ctx.substitute(
            params
                .message
                .as_deref()
                .unwrap_or(DEFAULT_BREAKPOINT_MESSAGE),
        );
        ctx.log(format!("Breakpoint triggered: {}", message));

        if !ctx.simulation {
            if let Some(hooks) = ctx.breakpoint_hooks() {
                hooks.on_breakpoint_hit(&message, &ctx.variables);
                hooks.pause_execution();
            }
        }
        Ok(())
    }
}
