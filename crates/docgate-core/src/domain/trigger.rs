//! Trigger events and the predicate deciding whether a run proceeds.

use serde::{Deserialize, Serialize};

use super::revision::RevisionPair;

/// What started the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
    Manual,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Push => "push",
            EventKind::PullRequest => "pull_request",
            EventKind::Manual => "manual",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    /// Accepts the names CI runners use (`workflow_dispatch` is a manual run).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "push" => Ok(EventKind::Push),
            "pull_request" | "pull-request" | "pr" => Ok(EventKind::PullRequest),
            "manual" | "workflow_dispatch" => Ok(EventKind::Manual),
            other => Err(format!("unknown event kind: {other}")),
        }
    }
}

/// A single trigger: event kind, the branch it concerns and the revisions.
///
/// For pushes `branch` is the pushed branch; for pull requests it is the
/// base branch the request targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub kind: EventKind,
    pub branch: String,
    pub revisions: RevisionPair,
}

impl TriggerEvent {
    pub fn new(kind: EventKind, branch: impl Into<String>, revisions: RevisionPair) -> Self {
        Self {
            kind,
            branch: branch.into(),
            revisions,
        }
    }
}

/// Outcome of evaluating a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDecision {
    /// The run proceeds to detection.
    pub run: bool,
    /// A successful build may be published.
    pub publish: bool,
}

impl TriggerDecision {
    pub const SKIP: TriggerDecision = TriggerDecision {
        run: false,
        publish: false,
    };
}

/// Decide whether `event` starts a run and whether that run may publish.
///
/// Only a push to `primary_branch` is eligible to publish. Pull requests run
/// when they target the primary branch; manual runs always run.
pub fn evaluate_trigger(event: &TriggerEvent, primary_branch: &str) -> TriggerDecision {
    let on_primary = event.branch == primary_branch;
    match event.kind {
        EventKind::Push if on_primary => TriggerDecision {
            run: true,
            publish: true,
        },
        EventKind::PullRequest if on_primary => TriggerDecision {
            run: true,
            publish: false,
        },
        EventKind::Manual => TriggerDecision {
            run: true,
            publish: false,
        },
        _ => TriggerDecision::SKIP,
    }
}
