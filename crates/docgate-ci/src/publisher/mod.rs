//! Publishing build output to its hosting location.
//!
//! - [`directory`]: merge-copy into a local directory
//! - [`git_branch`]: commit into a branch of a remote repository and push

pub mod directory;
pub mod git_branch;

use async_trait::async_trait;
use docgate_core::{PublishSummary, PublishTarget, Result, ToolRunner};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{PipelineConfig, PublishKind};

pub use directory::{sync_tree, DirectoryPublisher, NOJEKYLL};
pub use git_branch::GitBranchPublisher;

/// What to publish and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub artifact_dir: PathBuf,
    pub target: PublishTarget,
    /// Head revision the artifact was built from.
    pub revision: String,
}

/// Copies a build artifact to a publish target.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Publish the artifact. Unreachable targets and rejected authorization
    /// are `PublishFailed`.
    async fn publish(&self, request: &PublishRequest) -> Result<PublishSummary>;
}

/// Build the publisher selected by `config.publish.kind`.
pub fn publisher_from_config(
    config: &PipelineConfig,
    runner: Arc<dyn ToolRunner>,
) -> Arc<dyn Publisher> {
    match config.publish.kind {
        PublishKind::Directory => Arc::new(DirectoryPublisher::new(config.publish.nojekyll)),
        PublishKind::GitBranch => Arc::new(GitBranchPublisher::from_config(runner, config)),
    }
}
