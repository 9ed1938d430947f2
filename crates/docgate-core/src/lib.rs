//! docgate core library
//!
//! Domain types, git integration and the external tool capability shared by
//! the pipeline stages.

pub mod domain;
pub mod git;
pub mod obs;
pub mod telemetry;
pub mod tool;

pub use domain::{
    evaluate_trigger, normalize_path, ChangeSet, EventKind, PipelineError, PublishSummary,
    PublishTarget, Result, RevisionPair, TriggerDecision, TriggerEvent,
};

pub use git::{diff_name_only, resolve_revision, work_tree_root};

pub use obs::{
    emit_run_finished, emit_run_started, emit_stage_failed, emit_tool_finished, emit_transition,
    run_span,
};
pub use telemetry::init_tracing;
pub use tool::{ProcessRunner, ToolInvocation, ToolOutput, ToolRunner};

/// docgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
