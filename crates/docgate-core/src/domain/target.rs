//! Publish targets.

use serde::{Deserialize, Serialize};

/// Where build output goes, and whether existing files there survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishTarget {
    /// Branch name or directory path, depending on the publisher.
    pub id: String,
    /// Keep files at the target that the artifact does not contain.
    pub preserve_existing: bool,
}

impl PublishTarget {
    pub fn new(id: impl Into<String>, preserve_existing: bool) -> Self {
        Self {
            id: id.into(),
            preserve_existing,
        }
    }
}

impl std::fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Counts produced by a publish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishSummary {
    pub target: String,
    /// Files written because they were new or different.
    pub copied: usize,
    /// Files skipped because the target already had identical content.
    pub unchanged: usize,
    /// Stale target files deleted (only when preservation is off).
    pub removed: usize,
}

impl PublishSummary {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }
}
