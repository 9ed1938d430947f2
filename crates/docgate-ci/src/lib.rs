//! docgate CI - change-gated documentation build and publish
//!
//! Provides a pipeline orchestrator that:
//! - Decides from the trigger whether a run starts and may publish
//! - Holds a per-(pipeline, branch) lease for the whole run
//! - Detects changes under a watched prefix between two revisions
//! - Builds the site with an external generator
//! - Publishes the output, merging with what the target already has

pub mod builder;
pub mod config;
pub mod detector;
pub mod fakes;
pub mod lease;
pub mod pipeline;
pub mod publisher;
pub mod report;
pub mod state;

// Re-export key types
pub use builder::{BuildOutput, SiteBuilder};
pub use config::{
    LeaseConfig, OverlapPolicy, PipelineConfig, PublishConfig, PublishKind, DEFAULT_CONFIG_FILE,
};
pub use detector::{ChangeDetector, Detection, DiffProvider, GitDiffProvider};
pub use lease::{LeaseKey, LeaseManager, RunLease};
pub use pipeline::Pipeline;
pub use publisher::{
    publisher_from_config, sync_tree, DirectoryPublisher, GitBranchPublisher, PublishRequest,
    Publisher,
};
pub use report::{write_report_json, BuildSummary, Outcome, RunError, RunReport};
pub use state::{next_state, PipelineState, StageEvent, StateMachine};
