//! Domain-level error taxonomy for docgate.

/// Pipeline errors.
///
/// The first four variants are stage failures: they end the current run in
/// `Failed` and are never retried. The rest are infrastructure errors raised
/// before or around the stages.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("revision unavailable: {revision}: {reason}")]
    RevisionUnavailable { revision: String, reason: String },

    #[error("build failed with exit code {exit_code}")]
    BuildFailed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("publish to {target} failed: {reason}")]
    PublishFailed { target: String, reason: String },

    #[error("{stage} timed out after {limit_secs}s")]
    Timeout { stage: String, limit_secs: u64 },

    #[error("another run holds the lease for {key}")]
    LeaseHeld { key: String },

    #[error("invalid transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether this error is one of the terminal stage failures that a run
    /// report captures instead of propagating.
    pub fn is_stage_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::RevisionUnavailable { .. }
                | PipelineError::BuildFailed { .. }
                | PipelineError::PublishFailed { .. }
                | PipelineError::Timeout { .. }
        )
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::RevisionUnavailable { .. } => "revision_unavailable",
            PipelineError::BuildFailed { .. } => "build_failed",
            PipelineError::PublishFailed { .. } => "publish_failed",
            PipelineError::Timeout { .. } => "timeout",
            PipelineError::LeaseHeld { .. } => "lease_held",
            PipelineError::InvalidTransition { .. } => "invalid_transition",
            PipelineError::Config(_) => "config",
            PipelineError::Io(_) => "io",
        }
    }
}

/// Result type for docgate operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
