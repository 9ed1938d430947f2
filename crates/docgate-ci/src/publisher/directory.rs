//! Publishing into a local directory.
//!
//! [`sync_tree`] is also the copy step of the git branch publisher, which
//! runs it against a fresh checkout of the target branch.

use async_trait::async_trait;
use docgate_core::{PipelineError, PublishSummary, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::{PublishRequest, Publisher};

/// Marker telling GitHub Pages not to run Jekyll over the site.
pub const NOJEKYLL: &str = ".nojekyll";

/// Copy `src` into `dst`, merging with what is already there.
///
/// Files with identical content are left untouched. With `preserve` off,
/// files under `dst` that `src` lacks are removed and emptied directories
/// pruned; a top-level `.git` entry in `dst` is never touched.
pub fn sync_tree(
    src: &Path,
    dst: &Path,
    preserve: bool,
    nojekyll: bool,
) -> io::Result<PublishSummary> {
    if !src.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("artifact directory {} does not exist", src.display()),
        ));
    }
    fs::create_dir_all(dst)?;

    let mut summary = PublishSummary::new(dst.display().to_string());
    let mut wanted = BTreeSet::new();

    for rel in walk_files(src, true)? {
        let from = src.join(&rel);
        let to = dst.join(&rel);
        if to.is_file() && file_digest(&from)? == file_digest(&to)? {
            summary.unchanged += 1;
        } else {
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent)?;
            }
            if to.is_dir() {
                fs::remove_dir_all(&to)?;
            }
            fs::copy(&from, &to)?;
            summary.copied += 1;
        }
        wanted.insert(rel);
    }

    if nojekyll {
        let marker = PathBuf::from(NOJEKYLL);
        if !dst.join(&marker).is_file() {
            fs::write(dst.join(&marker), b"")?;
            summary.copied += 1;
        }
        wanted.insert(marker);
    }

    if !preserve {
        // Links in the target are removed, never followed.
        for rel in walk_files(dst, false)? {
            if !wanted.contains(&rel) {
                fs::remove_file(dst.join(&rel))?;
                summary.removed += 1;
            }
        }
        prune_empty_dirs(dst, true)?;
    }

    debug!(
        copied = summary.copied,
        unchanged = summary.unchanged,
        removed = summary.removed,
        target = %dst.display(),
        "Synchronised directory"
    );
    Ok(summary)
}

/// Relative paths of all files under `root`, skipping a top-level `.git`.
///
/// With `follow_links` set, symlinked directories are descended into and
/// their files listed under the link's path.
fn walk_files(root: &Path, follow_links: bool) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(follow_links)
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_name() == ".git"));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(root) {
            files.push(rel.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Remove empty directories below `dir`. Returns whether `dir` ended up empty.
fn prune_empty_dirs(dir: &Path, is_root: bool) -> io::Result<bool> {
    let mut empty = true;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if is_root && entry.file_name() == ".git" {
            empty = false;
            continue;
        }
        if entry.file_type()?.is_dir() {
            if prune_empty_dirs(&entry.path(), false)? {
                fs::remove_dir(entry.path())?;
            } else {
                empty = false;
            }
        } else {
            empty = false;
        }
    }
    Ok(empty)
}

fn file_digest(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(fs::read(path)?);
    Ok(hex::encode(hasher.finalize()))
}

/// Publisher whose target id is a local directory path.
#[derive(Debug, Clone, Default)]
pub struct DirectoryPublisher {
    nojekyll: bool,
}

impl DirectoryPublisher {
    pub fn new(nojekyll: bool) -> Self {
        Self { nojekyll }
    }
}

#[async_trait]
impl Publisher for DirectoryPublisher {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishSummary> {
        let src = request.artifact_dir.clone();
        let dst = PathBuf::from(&request.target.id);
        let preserve = request.target.preserve_existing;
        let nojekyll = self.nojekyll;
        let target = request.target.id.clone();

        let result = tokio::task::spawn_blocking(move || sync_tree(&src, &dst, preserve, nojekyll))
            .await
            .map_err(|e| PipelineError::PublishFailed {
                target: target.clone(),
                reason: format!("copy task failed: {e}"),
            })?;

        let mut summary = result.map_err(|e| PipelineError::PublishFailed {
            target: target.clone(),
            reason: e.to_string(),
        })?;
        summary.target = target;
        Ok(summary)
    }
}
