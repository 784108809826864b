//! Engine behavior tests
//!
//! Drives the executor through a recording collaborator and asserts on the
//! collaborator calls, the context and the log lines.

mod common;

use common::{context, node, nodes, LogCapture, RecordingLeafActions};
use scout_core::{Value, VariableStore};
use scout_sequence::{
    BreakpointHooks, ExecutionContext, PauseOnBreakpoint, RunControl, Sequence,
    SequenceExecutor, SequenceLibrary,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn executor(leaf: &Arc<RecordingLeafActions>) -> SequenceExecutor {
    SequenceExecutor::new(leaf.clone())
}

// ============================================================================
// Dispatcher
// ============================================================================

#[tokio::test]
async fn test_disabled_node_fails_without_calling_collaborator() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, logs) = context();

    let click = node(json!({"type": "click", "x": 1, "y": 2, "enabled": false}));
    assert!(!executor(&leaf).execute(&click, &mut ctx).await);

    assert!(leaf.executed().is_empty());
    assert!(!ctx.last_result);
    assert!(logs.contains("Invalid action parameters: CLICK"));
}

#[tokio::test]
async fn test_dispatch_logs_kind_and_description() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, logs) = context();

    let click = node(json!({"type": "click", "x": 1, "y": 2, "description": "Open bag"}));
    assert!(executor(&leaf).execute(&click, &mut ctx).await);
    assert!(executor(&leaf).simulate(&click, &mut ctx).await);

    let wait = node(json!({"type": "wait", "duration": 0.0}));
    assert!(executor(&leaf).execute(&wait, &mut ctx).await);

    assert!(logs.contains("Executing CLICK: Open bag"));
    assert!(logs.contains("Simulating CLICK: Open bag"));
    assert!(logs.contains("Executing WAIT: No description"));
}

#[tokio::test]
async fn test_raise_outside_try_aborts_list() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let actions = nodes(json!([
        {"type": "click", "x": 1, "y": 1},
        {"type": "type_text", "text": "raise"},
        {"type": "click", "x": 2, "y": 2}
    ]));
    assert!(!executor(&leaf).run(&actions, &mut ctx, false).await);

    assert_eq!(leaf.count("left click"), 1);
    assert!(ctx.last_message.contains("keyboard unavailable"));
    assert_eq!(ctx.stats.failed_actions, 1);
}

#[tokio::test]
async fn test_failure_message_threads_to_caller() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let seq = node(json!({
        "type": "sequence",
        "actions": [{"type": "click", "x": -5, "y": 3}]
    }));
    assert!(!executor(&leaf).execute(&seq, &mut ctx).await);
    assert_eq!(ctx.last_message, "Click at (-5, 3) is off screen");
}

#[tokio::test]
async fn test_simulation_never_executes_leaves() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let actions = nodes(json!([
        {"type": "set_variable", "variable_name": "n", "value": "2"},
        {"type": "loop", "mode": "bounded", "count": 2, "actions": [
            {"type": "click", "x": 5, "y": 5}
        ]}
    ]));

    assert!(executor(&leaf).run(&actions, &mut ctx, true).await);
    assert!(leaf.executed().is_empty());
    assert_eq!(leaf.simulated().len(), 2);
    // Data actions still apply while simulating
    assert_eq!(ctx.variables.get("n"), Some(&Value::Int(2)));
}

#[tokio::test]
async fn test_template_match_written_back() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let actions = nodes(json!([
        {"type": "template_search", "template_path": "chest.png", "save_to_variable": "chest"},
        {"type": "wait_for_text", "text": "Victory", "save_to_variable": "banner"},
        {"type": "click", "x": 1, "y": 1}
    ]));
    assert!(executor(&leaf).run(&actions, &mut ctx, false).await);

    assert_eq!(
        ctx.variables.get("chest"),
        Some(&Value::List(vec![Value::Int(320), Value::Int(240)]))
    );
    assert_eq!(ctx.variables.get("banner"), Some(&Value::from("Victory")));
    let last_match = ctx.last_match.as_ref().unwrap();
    assert_eq!(last_match.position, (320, 240));
    assert_eq!(ctx.last_text.as_deref(), Some("Victory"));
}

#[tokio::test]
async fn test_condition_error_fails_loudly() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, logs) = context();

    let cond = node(json!({
        "type": "conditional",
        "condition": "gold = 5",
        "then_actions": [{"type": "click", "x": 1, "y": 1}]
    }));
    assert!(!executor(&leaf).execute(&cond, &mut ctx).await);
    assert!(leaf.executed().is_empty());
    assert!(logs.contains("Condition evaluation failed"));
}

// ============================================================================
// Basic flow
// ============================================================================

#[tokio::test]
async fn test_conditional_branches() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, logs) = context();
    ctx.variables.set("gold", 700);

    let cond = node(json!({
        "type": "conditional",
        "condition": "${gold} >= 500",
        "then_actions": [{"type": "click", "x": 1, "y": 1}],
        "else_actions": [{"type": "click", "x": 2, "y": 2}]
    }));
    assert!(executor(&leaf).execute(&cond, &mut ctx).await);
    assert_eq!(leaf.executed(), vec!["left click at (1, 1)"]);
    assert!(logs.contains("Condition evaluated to: true"));

    ctx.variables.set("gold", 10);
    assert!(executor(&leaf).execute(&cond, &mut ctx).await);
    assert_eq!(leaf.executed().last().unwrap(), "left click at (2, 2)");
}

#[tokio::test]
async fn test_bounded_repeat_runs_exactly_count() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let repeat = node(json!({
        "type": "loop",
        "mode": "bounded",
        "count": 3,
        "actions": [{"type": "click", "x": 10, "y": 10}]
    }));
    assert!(executor(&leaf).execute(&repeat, &mut ctx).await);
    assert_eq!(leaf.count("left click"), 3);
}

#[tokio::test]
async fn test_bounded_repeat_stops_on_failed_iteration() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, logs) = context();

    let repeat = node(json!({
        "type": "loop",
        "mode": "bounded",
        "count": 3,
        "actions": [
            {"type": "increment_variable", "variable_name": "i"},
            {"type": "conditional", "condition": "${i} == 2", "then_actions": [
                {"type": "click", "x": -1, "y": 0}
            ]}
        ]
    }));
    assert!(!executor(&leaf).execute(&repeat, &mut ctx).await);

    assert_eq!(ctx.variables.get("i"), Some(&Value::Int(2)));
    assert!(logs.contains("Loop iteration 2 failed, breaking loop"));
    assert!(!logs.contains("Loop iteration 3/3"));
}

#[tokio::test]
async fn test_while_loop_runs_until_condition_false() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();
    ctx.variables.set("counter", 0);

    let while_loop = node(json!({
        "type": "loop",
        "mode": "conditioned",
        "condition": "${counter} < 3",
        "max_iterations": 10,
        "actions": [
            {"type": "increment_variable", "variable_name": "counter"},
            {"type": "click", "x": 1, "y": 1}
        ]
    }));
    assert!(executor(&leaf).execute(&while_loop, &mut ctx).await);

    assert_eq!(leaf.count("left click"), 3);
    assert_eq!(ctx.variables.get("counter"), Some(&Value::Int(3)));
}

#[tokio::test]
async fn test_while_loop_iteration_cap_is_a_failure() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, logs) = context();

    let while_loop = node(json!({
        "type": "loop",
        "mode": "conditioned",
        "condition": "true",
        "max_iterations": 4,
        "actions": [{"type": "click", "x": 1, "y": 1}]
    }));
    assert!(!executor(&leaf).execute(&while_loop, &mut ctx).await);

    assert_eq!(leaf.count("left click"), 4);
    assert!(logs.contains("Reached maximum iterations (4), breaking loop"));
    assert!(ctx.last_message.contains("maximum iterations"));
}

#[tokio::test]
async fn test_for_each_binds_each_item() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, logs) = context();
    ctx.variables.set("x", 7);

    let for_each = node(json!({
        "type": "loop",
        "mode": "for_each",
        "variable": "slot",
        "collection": "[1, 2, ${x}]",
        "actions": [{"type": "log", "message": "slot ${slot}"}]
    }));
    assert!(executor(&leaf).execute(&for_each, &mut ctx).await);

    assert!(logs.contains("[INFO] slot 1"));
    assert!(logs.contains("[INFO] slot 2"));
    assert!(logs.contains("[INFO] slot 7"));
    assert_eq!(ctx.variables.get("slot"), Some(&Value::Int(7)));
}

#[tokio::test]
async fn test_for_each_over_list_variable() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();
    ctx.variables.set(
        "targets",
        Value::List(vec![Value::from("a"), Value::from("b")]),
    );

    let for_each = node(json!({
        "type": "loop",
        "mode": "for_each",
        "variable": "t",
        "collection": "targets",
        "actions": [{"type": "increment_variable", "variable_name": "seen"}]
    }));
    assert!(executor(&leaf).execute(&for_each, &mut ctx).await);
    assert_eq!(ctx.variables.get("seen"), Some(&Value::Int(2)));

    let not_a_list = node(json!({
        "type": "loop",
        "mode": "for_each",
        "variable": "t",
        "collection": "42",
        "actions": []
    }));
    assert!(!executor(&leaf).execute(&not_a_list, &mut ctx).await);
}

#[tokio::test]
async fn test_call_sequence() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let library: SequenceLibrary = [
        Sequence::new(
            "collect",
            nodes(json!([{"type": "click", "x": 4, "y": 4}])),
        ),
        Sequence::new(
            "forever",
            nodes(json!([{"type": "call_sequence", "name": "forever"}])),
        ),
    ]
    .into_iter()
    .collect();
    let executor = executor(&leaf).with_library(library);

    let call = node(json!({"type": "call_sequence", "name": "collect"}));
    assert!(executor.execute(&call, &mut ctx).await);
    assert_eq!(leaf.executed(), vec!["left click at (4, 4)"]);

    let unknown = node(json!({"type": "call_sequence", "name": "nope"}));
    assert!(!executor.execute(&unknown, &mut ctx).await);
    assert_eq!(ctx.last_message, "Unknown sequence: nope");

    let recursive = node(json!({"type": "call_sequence", "name": "forever"}));
    assert!(!executor.execute(&recursive, &mut ctx).await);
    assert!(ctx.last_message.contains("call depth"));
}

// ============================================================================
// Switch / case
// ============================================================================

fn switch(expression: &str, with_default: bool) -> scout_sequence::ActionNode {
    let mut config = json!({
        "type": "switch_case",
        "expression": expression,
        "cases": [
            {"value": "1", "actions": [{"type": "click", "x": 1, "y": 0}]},
            {"value": "2", "actions": [{"type": "click", "x": 2, "y": 0}]}
        ]
    });
    if with_default {
        config["default_actions"] = json!([{"type": "click", "x": 9, "y": 9}]);
    }
    node(config)
}

#[tokio::test]
async fn test_switch_first_match_only() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    assert!(executor(&leaf).execute(&switch("2", false), &mut ctx).await);
    assert_eq!(leaf.executed(), vec!["left click at (2, 0)"]);
}

#[tokio::test]
async fn test_switch_no_match_no_default_is_noop_success() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, logs) = context();

    assert!(executor(&leaf).execute(&switch("9", false), &mut ctx).await);
    assert!(leaf.executed().is_empty());
    assert!(logs.contains("No case matched and no default actions"));
}

#[tokio::test]
async fn test_switch_default_and_numeric_match() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    assert!(executor(&leaf).execute(&switch("9", true), &mut ctx).await);
    assert_eq!(leaf.executed(), vec!["left click at (9, 9)"]);

    // 1.0 matches case "1" numerically
    ctx.variables.set("level", 1.0);
    assert!(executor(&leaf).execute(&switch("${level}", true), &mut ctx).await);
    assert_eq!(leaf.executed().last().unwrap(), "left click at (1, 0)");
}

// ============================================================================
// Try / catch / finally
// ============================================================================

#[tokio::test]
async fn test_try_failure_caught_and_error_stored() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let try_catch = node(json!({
        "type": "try_catch",
        "try_actions": [{"type": "click", "x": -1, "y": 7}],
        "catch_actions": [{"type": "click", "x": 3, "y": 3}],
        "store_error_variable": "err"
    }));
    assert!(executor(&leaf).execute(&try_catch, &mut ctx).await);

    assert_eq!(
        ctx.variables.get("err"),
        Some(&Value::from("Click at (-1, 7) is off screen"))
    );
    assert_eq!(leaf.executed().last().unwrap(), "left click at (3, 3)");
}

#[tokio::test]
async fn test_try_catches_raised_error() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let try_catch = node(json!({
        "type": "try_catch",
        "try_actions": [{"type": "type_text", "text": "raise"}],
        "catch_actions": [{"type": "log", "message": "recovered from ${err}"}],
        "error_variable": "err"
    }));
    assert!(executor(&leaf).execute(&try_catch, &mut ctx).await);

    let err = ctx.variables.get("err").unwrap().to_string();
    assert!(err.contains("keyboard unavailable"));
}

#[tokio::test]
async fn test_try_without_catch_propagates_and_runs_finally() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let try_catch = node(json!({
        "type": "try_catch",
        "try_actions": [{"type": "click", "x": -1, "y": 0}],
        "finally_actions": [{"type": "set_variable", "variable_name": "cleaned", "value": "yes"}]
    }));
    assert!(!executor(&leaf).execute(&try_catch, &mut ctx).await);

    assert_eq!(ctx.variables.get("cleaned"), Some(&Value::from("yes")));
    assert_eq!(ctx.last_message, "Click at (-1, 0) is off screen");
}

#[tokio::test]
async fn test_failing_catch_fails_node() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let try_catch = node(json!({
        "type": "try_catch",
        "try_actions": [{"type": "click", "x": -1, "y": 0}],
        "catch_actions": [{"type": "template_search", "template_path": "missing.png"}]
    }));
    assert!(!executor(&leaf).execute(&try_catch, &mut ctx).await);
    assert_eq!(ctx.last_message, "Template not found");
}

#[tokio::test]
async fn test_failing_finally_still_merges_variables() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, logs) = context();

    let try_catch = node(json!({
        "type": "try_catch",
        "try_actions": [{"type": "set_variable", "variable_name": "loot", "value": "3"}],
        "finally_actions": [{"type": "click", "x": -1, "y": 0}]
    }));
    assert!(!executor(&leaf).execute(&try_catch, &mut ctx).await);

    assert_eq!(ctx.variables.get("loot"), Some(&Value::Int(3)));
    assert!(logs.contains("Finally block failed"));
}

// ============================================================================
// Parallel groups
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parallel_race_first_branch_wins() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let race = node(json!({
        "type": "parallel",
        "wait_for_all": false,
        "branches": [
            [
                {"type": "set_variable", "variable_name": "from_a", "value": "1"},
                {"type": "wait", "duration": 3600.0}
            ],
            [
                {"type": "set_variable", "variable_name": "from_b", "value": "2"}
            ]
        ]
    }));

    let executor = executor(&leaf);
    let ok = tokio::time::timeout(Duration::from_secs(5), executor.execute(&race, &mut ctx))
        .await
        .expect("race must not wait for the blocked branch");
    assert!(ok);

    assert_eq!(ctx.variables.get("from_b"), Some(&Value::Int(2)));
    assert!(!ctx.variables.contains("from_a"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parallel_race_first_failure_fails_group() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let race = node(json!({
        "type": "parallel",
        "wait_for_all": false,
        "branches": [
            [{"type": "wait", "duration": 3600.0}],
            [{"type": "click", "x": -1, "y": 0}]
        ]
    }));
    assert!(!executor(&leaf).execute(&race, &mut ctx).await);
    assert!(ctx.last_message.contains("Parallel branch 2 failed"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parallel_wait_for_all_merges_every_branch() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, logs) = context();

    let group = node(json!({
        "type": "parallel",
        "wait_for_all": true,
        "branches": [
            [
                {"type": "set_variable", "variable_name": "a", "value": "1"},
                {"type": "click", "x": -1, "y": 0}
            ],
            [
                {"type": "set_variable", "variable_name": "b", "value": "2"}
            ]
        ]
    }));
    assert!(!executor(&leaf).execute(&group, &mut ctx).await);

    assert_eq!(ctx.variables.get("a"), Some(&Value::Int(1)));
    assert_eq!(ctx.variables.get("b"), Some(&Value::Int(2)));
    assert!(logs.contains("Parallel execution complete: 1/2 branches succeeded"));
    assert!(ctx.last_message.starts_with("1 of 2 parallel branches failed"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parallel_late_branch_keeps_earlier_write() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();
    ctx.variables.set("gold", 0);

    let group = node(json!({
        "type": "parallel",
        "wait_for_all": true,
        "branches": [
            [{"type": "set_variable", "variable_name": "gold", "value": "100"}],
            [{"type": "wait", "duration": 0.2}]
        ]
    }));
    assert!(executor(&leaf).execute(&group, &mut ctx).await);

    assert_eq!(ctx.variables.get("gold"), Some(&Value::Int(100)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parallel_conflicting_writes_resolve_by_completion_order() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let group = node(json!({
        "type": "parallel",
        "wait_for_all": true,
        "branches": [
            [
                {"type": "wait", "duration": 0.2},
                {"type": "set_variable", "variable_name": "owner", "value": "slow"}
            ],
            [{"type": "set_variable", "variable_name": "owner", "value": "fast"}]
        ]
    }));
    assert!(executor(&leaf).execute(&group, &mut ctx).await);

    assert_eq!(ctx.variables.get("owner"), Some(&Value::from("slow")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_respects_worker_bound() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let group = node(json!({
        "type": "parallel",
        "max_workers": 2,
        "branches": [
            [{"type": "wait", "duration": 0.05}],
            [{"type": "wait", "duration": 0.05}],
            [{"type": "wait", "duration": 0.05}],
            [{"type": "wait", "duration": 0.05}],
            [{"type": "wait", "duration": 0.05}]
        ]
    }));
    assert!(executor(&leaf).execute(&group, &mut ctx).await);

    assert_eq!(leaf.count("wait"), 5);
    assert!(leaf.max_concurrent_waits() <= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parallel_branches_are_isolated() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();
    ctx.variables.set("shared", 0);

    let group = node(json!({
        "type": "parallel",
        "branches": [
            [{"type": "increment_variable", "variable_name": "shared"}],
            [{"type": "increment_variable", "variable_name": "shared"}]
        ]
    }));
    assert!(executor(&leaf).execute(&group, &mut ctx).await);

    // Each branch incremented its own copy of 0
    assert_eq!(ctx.variables.get("shared"), Some(&Value::Int(1)));
}

// ============================================================================
// Breakpoints
// ============================================================================

#[derive(Clone, Default)]
struct RecordingHooks {
    hits: Arc<Mutex<Vec<(String, Option<Value>)>>>,
}

impl BreakpointHooks for RecordingHooks {
    fn on_breakpoint_hit(&self, message: &str, variables: &VariableStore) {
        self.hits
            .lock()
            .unwrap()
            .push((message.to_string(), variables.get("hp").cloned()));
    }
}

#[tokio::test]
async fn test_breakpoint_triggers_hooks_outside_simulation() {
    let leaf = RecordingLeafActions::new();
    let hooks = RecordingHooks::default();
    let logs = LogCapture::new();
    let mut ctx = ExecutionContext::new()
        .with_log_sink(logs.clone())
        .with_breakpoint_hooks(hooks.clone());
    ctx.variables.set("hp", 12);

    let low_hp = node(json!({
        "type": "breakpoint",
        "condition": "${hp} < 20",
        "message": "HP low: ${hp}"
    }));
    assert!(executor(&leaf).execute(&low_hp, &mut ctx).await);
    assert!(executor(&leaf).simulate(&low_hp, &mut ctx).await);

    let hits = hooks.hits.lock().unwrap().clone();
    assert_eq!(hits, vec![("HP low: 12".to_string(), Some(Value::Int(12)))]);
    assert_eq!(logs.count("Breakpoint triggered: HP low: 12"), 2);
}

#[tokio::test]
async fn test_breakpoint_never_fails() {
    let leaf = RecordingLeafActions::new();
    let hooks = RecordingHooks::default();
    let mut ctx = ExecutionContext::new().with_breakpoint_hooks(hooks.clone());

    let not_met = node(json!({"type": "breakpoint", "condition": "1 > 2"}));
    assert!(executor(&leaf).execute(&not_met, &mut ctx).await);

    let broken = node(json!({"type": "breakpoint", "condition": "what is this"}));
    assert!(executor(&leaf).execute(&broken, &mut ctx).await);

    assert!(hooks.hits.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_breakpoint_pause_holds_run_until_resume() {
    let leaf = RecordingLeafActions::new();
    let control = RunControl::new();
    let mut ctx = ExecutionContext::new()
        .with_control(control.clone())
        .with_breakpoint_hooks(PauseOnBreakpoint::new(control.clone()));

    let actions = nodes(json!([
        {"type": "breakpoint"},
        {"type": "click", "x": 8, "y": 8}
    ]));

    let resumer = {
        let control = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            control.resume();
        })
    };

    assert!(executor(&leaf).run(&actions, &mut ctx, false).await);
    resumer.await.unwrap();
    assert_eq!(leaf.executed(), vec!["left click at (8, 8)"]);
}

// ============================================================================
// Run entry point
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_flag_ends_run() {
    let leaf = RecordingLeafActions::new();
    let control = RunControl::new();
    let mut ctx = ExecutionContext::new().with_control(control.clone());

    let actions = nodes(json!([
        {"type": "loop", "mode": "bounded", "count": 1000, "actions": [
            {"type": "wait", "duration": 0.01}
        ]}
    ]));

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        control.stop();
    });

    assert!(!executor(&leaf).run(&actions, &mut ctx, false).await);
    stopper.await.unwrap();
    assert!(leaf.count("wait") < 1000);
    assert_eq!(ctx.last_message, "Execution stopped");
}

#[tokio::test]
async fn test_run_skips_disabled_root_steps_and_records_stats() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, logs) = context();

    let actions = nodes(json!([
        {"type": "click", "x": 1, "y": 1},
        {"type": "click", "x": 2, "y": 2, "enabled": false},
        {"type": "click", "x": 3, "y": 3}
    ]));
    assert!(executor(&leaf).run(&actions, &mut ctx, false).await);

    assert_eq!(leaf.count("left click"), 2);
    assert!(logs.contains("Skipping disabled step 2: CLICK"));
    assert_eq!(ctx.stats.total_actions, 2);
    assert_eq!(ctx.stats.successful_actions, 2);
    assert!(ctx.stats.finished_at.is_some());
    assert!(logs.contains("Run finished: 2/2 actions, 100.0% success rate"));
}

#[tokio::test]
async fn test_loop_enabled_restarts_until_failure() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, logs) = context();
    ctx.loop_enabled = true;

    let actions = nodes(json!([
        {"type": "increment_variable", "variable_name": "pass"},
        {"type": "conditional", "condition": "${pass} >= 3", "then_actions": [
            {"type": "click", "x": -1, "y": 0}
        ]}
    ]));
    assert!(!executor(&leaf).run(&actions, &mut ctx, false).await);

    assert_eq!(ctx.variables.get("pass"), Some(&Value::Int(3)));
    assert_eq!(logs.count("restarting due to loop enabled"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_step_delay_between_root_steps() {
    let leaf = RecordingLeafActions::new();
    let (ctx, _logs) = context();
    let mut ctx = ctx.with_step_delay(Duration::from_millis(500));

    let actions = nodes(json!([
        {"type": "click", "x": 1, "y": 1},
        {"type": "click", "x": 2, "y": 2},
        {"type": "click", "x": 3, "y": 3}
    ]));

    let started = tokio::time::Instant::now();
    assert!(executor(&leaf).run(&actions, &mut ctx, false).await);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1000));
    assert!(elapsed < Duration::from_millis(1500));
}

#[tokio::test]
async fn test_run_named_sequence_from_yaml() {
    let leaf = RecordingLeafActions::new();
    let (mut ctx, _logs) = context();

    let yaml = r#"
- type: set_variable
  variable_name: target
  value: 3
- type: loop
  mode: while
  condition: ${done} < ${target}
  actions:
    - type: increment_variable
      variable_name: done
    - type: click
      x: 50
      y: 60
"#;
    let actions: Vec<scout_sequence::ActionNode> = serde_yaml::from_str(yaml).unwrap();
    let library: SequenceLibrary = std::iter::once(Sequence::new("farm", actions)).collect();
    let executor = executor(&leaf).with_library(library);

    ctx.variables.set("done", 0);
    assert!(executor.run_sequence("farm", &mut ctx, false).await);
    assert_eq!(leaf.count("left click"), 3);

    assert!(!executor.run_sequence("missing", &mut ctx, false).await);
}
