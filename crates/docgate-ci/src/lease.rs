//! Single-active-run lease keyed by (pipeline, branch).
//!
//! Backed by an exclusive advisory lock on a file under the lease directory,
//! so the guarantee holds across processes. The lock is released when the
//! [`RunLease`] is dropped.

use docgate_core::{PipelineError, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::OverlapPolicy;

const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Identity of the runs that must not overlap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeaseKey {
    pub pipeline: String,
    pub branch: String,
}

impl LeaseKey {
    pub fn new(pipeline: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            branch: branch.into(),
        }
    }

    /// Lock file name; anything outside `[A-Za-z0-9._-]` becomes `_`.
    pub fn file_name(&self) -> String {
        format!(
            "{}--{}.lock",
            sanitize(&self.pipeline),
            sanitize(&self.branch)
        )
    }
}

impl std::fmt::Display for LeaseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.pipeline, self.branch)
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// A held lease. Dropping it releases the lock.
#[derive(Debug)]
pub struct RunLease {
    key: LeaseKey,
    file: File,
    path: PathBuf,
}

impl RunLease {
    pub fn key(&self) -> &LeaseKey {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLease {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        debug!(key = %self.key, "Released run lease");
    }
}

/// Hands out leases from lock files in one directory.
#[derive(Debug, Clone)]
pub struct LeaseManager {
    dir: PathBuf,
}

impl LeaseManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Take the lease or fail with `LeaseHeld` if another run has it.
    pub fn try_acquire(&self, key: &LeaseKey) -> Result<RunLease> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(key.file_name());
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(key = %key, path = %path.display(), "Acquired run lease");
                Ok(RunLease {
                    key: key.clone(),
                    file,
                    path,
                })
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(PipelineError::LeaseHeld {
                    key: key.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Take the lease according to `policy`.
    ///
    /// `Queue` polls until the lease frees up; when `wait_limit` is set and
    /// elapses first, the result is `Timeout`.
    pub async fn acquire(
        &self,
        key: &LeaseKey,
        policy: OverlapPolicy,
        wait_limit: Option<Duration>,
    ) -> Result<RunLease> {
        match policy {
            OverlapPolicy::Reject => self.try_acquire(key),
            OverlapPolicy::Queue => {
                let start = Instant::now();
                let mut announced = false;
                loop {
                    match self.try_acquire(key) {
                        Err(PipelineError::LeaseHeld { .. }) => {
                            if let Some(limit) = wait_limit {
                                if start.elapsed() >= limit {
                                    return Err(PipelineError::Timeout {
                                        stage: format!("waiting for lease {key}"),
                                        limit_secs: limit.as_secs(),
                                    });
                                }
                            }
                            if !announced {
                                info!(key = %key, "Another run holds the lease, queueing");
                                announced = true;
                            }
                            tokio::time::sleep(QUEUE_POLL_INTERVAL).await;
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}
