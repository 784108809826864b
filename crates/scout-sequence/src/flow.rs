//! Basic flow handlers: conditional, loops, nested and named sequences

use scout_core::{parse_value, Value, ValueError};

use crate::action::{ActionNode, ConditionalParams, LoopMode, LoopParams};
use crate::context::ExecutionContext;
use crate::error::{SequenceError, SequenceResult};
use crate::executor::{SequenceExecutor, MAX_CALL_DEPTH};

impl SequenceExecutor {
    /// Evaluate a condition, logging evaluation failures
    pub(crate) fn evaluate_condition(
        &self,
        condition: &str,
        ctx: &ExecutionContext,
    ) -> SequenceResult<bool> {
        self.evaluator
            .evaluate(condition, &ctx.variables)
            .map_err(|err| {
                ctx.log(format!("Condition evaluation failed: {}", err));
                SequenceError::from(err)
            })
    }

    pub(crate) async fn run_conditional(
        &self,
        params: &ConditionalParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let result = self.evaluate_condition(&params.condition, ctx)?;
        ctx.log(format!("Condition evaluated to: {}", result));

        if result {
            ctx.log("Executing 'then' branch");
            self.execute_list(&params.then_actions, ctx).await
        } else if !params.else_actions.is_empty() {
            ctx.log("Executing 'else' branch");
            self.execute_list(&params.else_actions, ctx).await
        } else {
            Ok(())
        }
    }

    pub(crate) async fn run_loop(
        &self,
        params: &LoopParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        match params.mode {
            LoopMode::Bounded => {
                self.run_bounded(params.count.unwrap_or(0), &params.actions, ctx)
                    .await
            }
            LoopMode::Conditioned => self.run_while(params, ctx).await,
            LoopMode::ForEach => self.run_for_each(params, ctx).await,
        }
    }

    async fn run_bounded(
        &self,
        count: u32,
        actions: &[ActionNode],
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        ctx.log(format!("Starting loop with {} iterations", count));

        for i in 1..=count {
            self.loop_checkpoint(ctx).await?;
            ctx.log(format!("Loop iteration {}/{}", i, count));
            self.run_iteration(i, actions, ctx).await?;
        }
        Ok(())
    }

    async fn run_while(
        &self,
        params: &LoopParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        ctx.log(format!(
            "Starting while loop with condition: {} (max {} iterations)",
            params.condition, params.max_iterations
        ));

        let mut iteration = 0;
        loop {
            self.loop_checkpoint(ctx).await?;

            if !self.evaluate_condition(&params.condition, ctx)? {
                ctx.log(format!(
                    "Loop condition false, exiting after {} iterations",
                    iteration
                ));
                return Ok(());
            }

            if iteration >= params.max_iterations {
                ctx.log(format!(
                    "Reached maximum iterations ({}), breaking loop",
                    params.max_iterations
                ));
                return Err(SequenceError::MaxIterations(params.max_iterations));
            }

            iteration += 1;
            ctx.log(format!("Loop iteration {}", iteration));
            self.run_iteration(iteration, &params.actions, ctx).await?;
        }
    }

    async fn run_for_each(
        &self,
        params: &LoopParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let variable = params.variable.trim();
        let items = collection_items(&params.collection, ctx)?;
        let total = items.len();
        ctx.log(format!("Starting for-each loop over {} items", total));

        for (index, item) in items.into_iter().enumerate() {
            self.loop_checkpoint(ctx).await?;
            ctx.log(format!(
                "Loop iteration {}/{}: {} = {}",
                index + 1,
                total,
                variable,
                item
            ));
            ctx.variables.set(variable, item);
            self.run_iteration(index as u32 + 1, &params.actions, ctx)
                .await?;
        }
        Ok(())
    }

    async fn run_iteration(
        &self,
        iteration: u32,
        actions: &[ActionNode],
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        self.execute_list(actions, ctx).await.map_err(|err| {
            if !matches!(err, SequenceError::Stopped) {
                ctx.log(format!("Loop iteration {} failed, breaking loop", iteration));
            }
            err
        })
    }

    async fn loop_checkpoint(&self, ctx: &ExecutionContext) -> SequenceResult<()> {
        self.checkpoint(ctx).await.map_err(|err| {
            ctx.log("Execution stopped, breaking loop");
            err
        })
    }

    pub(crate) async fn run_nested_sequence(
        &self,
        actions: &[ActionNode],
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        ctx.log(format!("Executing sequence of {} actions", actions.len()));
        self.execute_list(actions, ctx).await
    }

    /// Run a named sequence from the library against the current context
    pub(crate) async fn call_sequence(
        &self,
        name: &str,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let name = name.trim();
        if ctx.call_depth >= MAX_CALL_DEPTH {
            return Err(SequenceError::RecursionLimit(MAX_CALL_DEPTH));
        }
        let sequence = self
            .library()
            .get(name)
            .ok_or_else(|| SequenceError::UnknownSequence(name.to_string()))?;

        ctx.log(format!("Calling sequence: {}", name));
        ctx.call_depth += 1;
        let result = self.execute_list(&sequence.actions, ctx).await;
        ctx.call_depth -= 1;
        result
    }
}

/// Items of a for-each collection: a bound list variable by name, or list text
/// after substitution
fn collection_items(collection: &str, ctx: &ExecutionContext) -> SequenceResult<Vec<Value>> {
    let collection = collection.trim();
    if let Some(Value::List(items)) = ctx.variables.get(collection) {
        return Ok(items.clone());
    }

    match parse_value(&ctx.substitute(collection)) {
        Value::List(items) => Ok(items),
        other => Err(ValueError::NotList(other.to_string()).into()),
    }
}
