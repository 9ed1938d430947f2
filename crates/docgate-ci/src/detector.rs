//! Change detection between two revisions.

use async_trait::async_trait;
use docgate_core::{diff_name_only, ChangeSet, PipelineError, Result, RevisionPair};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Supplies the change set for a revision pair.
#[async_trait]
pub trait DiffProvider: Send + Sync {
    async fn changed_paths(&self, revisions: &RevisionPair) -> Result<ChangeSet>;
}

/// Diff provider backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitDiffProvider {
    repo_dir: PathBuf,
}

impl GitDiffProvider {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }
}

#[async_trait]
impl DiffProvider for GitDiffProvider {
    async fn changed_paths(&self, revisions: &RevisionPair) -> Result<ChangeSet> {
        let repo_dir = self.repo_dir.clone();
        let pair = revisions.clone();
        tokio::task::spawn_blocking(move || diff_name_only(&repo_dir, &pair))
            .await
            .map_err(|e| PipelineError::RevisionUnavailable {
                revision: revisions.to_string(),
                reason: format!("diff task failed: {e}"),
            })?
    }
}

/// Result of a detection: the whole change set and the watched subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub changes: ChangeSet,
    pub matched: Vec<String>,
}

impl Detection {
    /// Whether any watched path changed.
    pub fn relevant(&self) -> bool {
        !self.matched.is_empty()
    }
}

/// Reports whether any path under the watched prefix differs.
pub struct ChangeDetector {
    provider: Arc<dyn DiffProvider>,
    prefix: String,
}

impl ChangeDetector {
    pub fn new(provider: Arc<dyn DiffProvider>, prefix: impl Into<String>) -> Self {
        Self {
            provider,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Compute the change set and match it against the watched prefix.
    ///
    /// A provider failure is never read as "no change": whatever the provider
    /// reports, it surfaces as `RevisionUnavailable`.
    pub async fn detect(&self, revisions: &RevisionPair) -> Result<Detection> {
        let changes = self
            .provider
            .changed_paths(revisions)
            .await
            .map_err(|e| match e {
                e @ PipelineError::RevisionUnavailable { .. } => e,
                other => PipelineError::RevisionUnavailable {
                    revision: revisions.to_string(),
                    reason: other.to_string(),
                },
            })?;

        let matched = changes.matching(&self.prefix);
        debug!(
            total = changes.len(),
            matched = matched.len(),
            prefix = %self.prefix,
            "Computed change set"
        );

        Ok(Detection { changes, matched })
    }

    /// Whether any changed path starts with the watched prefix.
    pub async fn has_relevant_change(&self, revisions: &RevisionPair) -> Result<bool> {
        Ok(self.detect(revisions).await?.relevant())
    }
}
