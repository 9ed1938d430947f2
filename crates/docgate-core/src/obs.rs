//! Structured observability hooks for pipeline run lifecycle events.
//!
//! - [`run_span`] builds the run-scoped span; async callers attach it with
//!   `tracing::Instrument` so it is entered only while the run is polled
//! - `emit_*` functions log the lifecycle: start, state transition, tool
//!   completion, stage failure, finish
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`).

use tracing::{info, Span};

/// Span tagged with the run id and pipeline name.
///
/// ```ignore
/// pipeline.execute(trigger).instrument(run_span("run-12345", "docs")).await
/// ```
pub fn run_span(run_id: &str, pipeline: &str) -> Span {
    tracing::info_span!("docgate.run", run_id = %run_id, pipeline = %pipeline)
}

/// Emit event: run started for a trigger.
pub fn emit_run_started(run_id: &str, event_kind: &str, branch: &str, revisions: &str) {
    info!(
        event = "run.started",
        run_id = %run_id,
        trigger = %event_kind,
        branch = %branch,
        revisions = %revisions,
    );
}

/// Emit event: pipeline state machine moved between states.
pub fn emit_transition(run_id: &str, from: &str, to: &str, on: &str) {
    info!(event = "run.transition", run_id = %run_id, from = %from, to = %to, on = %on);
}

/// Emit event: an external tool finished.
pub fn emit_tool_finished(label: &str, exit_code: i32, duration_ms: u64) {
    info!(
        event = "stage.tool_finished",
        tool = %label,
        exit_code = exit_code,
        duration_ms = duration_ms,
    );
}

/// Emit event: run finished with its outcome.
pub fn emit_run_finished(run_id: &str, outcome: &str, duration_ms: u64, success: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        outcome = %outcome,
        duration_ms = duration_ms,
        success = success,
    );
}

/// Emit event: a stage failed (warning level).
pub fn emit_stage_failed(run_id: &str, stage: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "stage.failed", run_id = %run_id, stage = %stage, error = %error);
}
