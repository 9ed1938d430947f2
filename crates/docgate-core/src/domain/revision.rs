//! Revision pairs and the change sets derived from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Two revisions of a source tree: the diff is computed from `base` to `head`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevisionPair {
    pub base: String,
    pub head: String,
}

impl RevisionPair {
    pub fn new(base: impl Into<String>, head: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            head: head.into(),
        }
    }
}

impl std::fmt::Display for RevisionPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.base, self.head)
    }
}

/// Set of changed paths between two revisions.
///
/// Paths are repository-relative with `/` separators; the set is sorted and
/// free of duplicates. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    paths: BTreeSet<String>,
}

impl ChangeSet {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = paths
            .into_iter()
            .map(|p| normalize_path(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();
        Self { paths }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Paths that start with `prefix`, in sorted order.
    ///
    /// An empty prefix matches every path.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        let prefix = normalize_path(prefix);
        self.paths
            .iter()
            .filter(|p| p.starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Whether any path starts with `prefix`.
    pub fn touches(&self, prefix: &str) -> bool {
        let prefix = normalize_path(prefix);
        self.paths.iter().any(|p| p.starts_with(&prefix))
    }
}

/// Strip a leading `./` and turn `\` separators into `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let mut rest = path.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.to_string()
}
