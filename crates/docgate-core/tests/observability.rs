//! Observability tests for the docs pipeline run lifecycle.
//!
//! These tests verify that structured tracing events are emitted for run
//! start, state transitions, tool completion, stage failure and run finish.

use docgate_core::{
    emit_run_finished, emit_run_started, emit_stage_failed, emit_tool_finished, emit_transition,
    run_span, PipelineError,
};
use tracing_test::traced_test;

/// Test: emit_run_started logs the trigger and branch
#[traced_test]
#[test]
fn test_emit_run_started_logs_trigger() {
    emit_run_started("run-123", "push", "main", "abc..def");

    assert!(logs_contain("run.started"));
    assert!(logs_contain("trigger=push"));
    assert!(logs_contain("branch=main"));
}

/// Test: emit_transition logs both states and the event
#[traced_test]
#[test]
fn test_emit_transition_logs_states() {
    emit_transition("run-456", "detecting", "building", "changed");

    assert!(logs_contain("run.transition"));
    assert!(logs_contain("from=detecting"));
    assert!(logs_contain("to=building"));
}

#[traced_test]
#[test]
fn test_emit_tool_finished_logs_exit_code() {
    emit_tool_finished("build", 0, 1200);

    assert!(logs_contain("stage.tool_finished"));
    assert!(logs_contain("exit_code=0"));
}

/// Test: stage failures are logged at warn level
#[traced_test]
#[test]
fn test_emit_stage_failed_logs_warning() {
    let err = PipelineError::PublishFailed {
        target: "gh-pages".to_string(),
        reason: "push rejected".to_string(),
    };
    emit_stage_failed("run-err-001", "publishing", &err);

    assert!(logs_contain("WARN"));
    assert!(logs_contain("push rejected"));
}

#[traced_test]
#[test]
fn test_emit_run_finished_logs_outcome() {
    emit_run_finished("run-789", "published", 5000, true);

    assert!(logs_contain("run.finished"));
    assert!(logs_contain("outcome=published"));
}

/// Test: events inside the run span carry the run id
#[traced_test]
#[test]
fn test_run_span_tags_events() {
    let span = run_span("span-run-1", "docs");
    span.in_scope(|| emit_transition("span-run-1", "idle", "detecting", "triggered"));

    assert!(logs_contain("docgate.run"));
    assert!(logs_contain("pipeline=docs"));
}

/// Test: an instrumented future carries the span across await points
#[traced_test]
#[tokio::test]
async fn test_run_span_instruments_future() {
    use tracing::Instrument;

    async {
        tokio::task::yield_now().await;
        emit_run_finished("span-run-2", "no_change", 3, true);
    }
    .instrument(run_span("span-run-2", "guides"))
    .await;

    assert!(logs_contain("pipeline=guides"));
    assert!(logs_contain("run.finished"));
}
