//! In-memory fakes for the pipeline capabilities (testing only)
//!
//! Provides `StaticDiffProvider`, `ScriptedRunner` and `RecordingPublisher`
//! that satisfy the trait contracts without git, subprocesses or a network.
//! A shared [`CallLog`] records the order in which fakes were invoked.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docgate_core::{
    ChangeSet, PipelineError, PublishSummary, Result, RevisionPair, ToolInvocation, ToolOutput,
    ToolRunner,
};

use crate::detector::DiffProvider;
use crate::publisher::{PublishRequest, Publisher};

/// Ordered record of fake invocations, shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }
}

// ---------------------------------------------------------------------------
// StaticDiffProvider
// ---------------------------------------------------------------------------

/// Diff provider returning a fixed change set, or a fixed failure.
#[derive(Debug, Clone)]
pub struct StaticDiffProvider {
    result: std::result::Result<Vec<String>, String>,
    log: CallLog,
}

impl StaticDiffProvider {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            result: Ok(paths.into_iter().map(Into::into).collect()),
            log: CallLog::new(),
        }
    }

    /// Provider whose every call fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            result: Err(reason.into()),
            log: CallLog::new(),
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }
}

#[async_trait]
impl DiffProvider for StaticDiffProvider {
    async fn changed_paths(&self, revisions: &RevisionPair) -> Result<ChangeSet> {
        self.log.push("diff");
        match &self.result {
            Ok(paths) => Ok(ChangeSet::new(paths)),
            Err(reason) => Err(PipelineError::RevisionUnavailable {
                revision: revisions.to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedRunner
// ---------------------------------------------------------------------------

/// Tool runner that records invocations and returns a scripted exit status.
#[derive(Debug, Clone)]
pub struct ScriptedRunner {
    exit_code: i32,
    stderr: String,
    delay: Option<Duration>,
    invocations: Arc<Mutex<Vec<ToolInvocation>>>,
    log: CallLog,
}

impl ScriptedRunner {
    /// Every invocation exits 0.
    pub fn succeeding() -> Self {
        Self::failing(0, "")
    }

    /// Every invocation exits with `exit_code` and `stderr`.
    pub fn failing(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stderr: stderr.into(),
            delay: None,
            invocations: Arc::new(Mutex::new(Vec::new())),
            log: CallLog::new(),
        }
    }

    /// Sleep this long before returning, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        self.log.push(invocation.label.clone());
        self.invocations.lock().unwrap().push(invocation.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(ToolOutput {
            exit_code: self.exit_code,
            stdout: String::new(),
            stderr: self.stderr.clone(),
            duration_ms: 1,
            success: self.exit_code == 0,
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingPublisher
// ---------------------------------------------------------------------------

/// Publisher that records requests and optionally fails.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    failure: Option<String>,
    requests: Arc<Mutex<Vec<PublishRequest>>>,
    log: CallLog,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publisher whose every call fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn requests(&self) -> Vec<PublishRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishSummary> {
        self.log.push("publish");
        self.requests.lock().unwrap().push(request.clone());
        if let Some(reason) = &self.failure {
            return Err(PipelineError::PublishFailed {
                target: request.target.id.clone(),
                reason: reason.clone(),
            });
        }
        Ok(PublishSummary {
            target: request.target.id.clone(),
            copied: 1,
            unchanged: 0,
            removed: 0,
        })
    }
}
