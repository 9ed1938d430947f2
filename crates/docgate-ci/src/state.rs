//! Pipeline run state machine.

use docgate_core::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// State of a single run. `Idle` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Detecting,
    Building,
    Publishing,
    Failed,
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Detecting => "detecting",
            PipelineState::Building => "building",
            PipelineState::Publishing => "publishing",
            PipelineState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageEvent {
    /// Trigger accepted; detection starts.
    Triggered,
    NoChange,
    Changed,
    /// Detection could not resolve the revisions.
    DetectFailed,
    /// Build succeeded and the trigger may publish.
    Built,
    /// Build succeeded but the trigger may not publish.
    BuiltWithoutPublish,
    BuildFailed,
    Published,
    PublishFailed,
    TimedOut,
}

impl StageEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StageEvent::Triggered => "triggered",
            StageEvent::NoChange => "no_change",
            StageEvent::Changed => "changed",
            StageEvent::DetectFailed => "detect_failed",
            StageEvent::Built => "built",
            StageEvent::BuiltWithoutPublish => "built_without_publish",
            StageEvent::BuildFailed => "build_failed",
            StageEvent::Published => "published",
            StageEvent::PublishFailed => "publish_failed",
            StageEvent::TimedOut => "timed_out",
        }
    }

    /// The failure event a stage error maps to, or `None` for errors that
    /// are not stage failures.
    pub fn for_error(err: &PipelineError) -> Option<StageEvent> {
        match err {
            PipelineError::RevisionUnavailable { .. } => Some(StageEvent::DetectFailed),
            PipelineError::BuildFailed { .. } => Some(StageEvent::BuildFailed),
            PipelineError::PublishFailed { .. } => Some(StageEvent::PublishFailed),
            PipelineError::Timeout { .. } => Some(StageEvent::TimedOut),
            PipelineError::LeaseHeld { .. }
            | PipelineError::InvalidTransition { .. }
            | PipelineError::Config(_)
            | PipelineError::Io(_) => None,
        }
    }
}

impl std::fmt::Display for StageEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Pure transition function.
pub fn next_state(from: PipelineState, event: StageEvent) -> Result<PipelineState> {
    use PipelineState::*;
    use StageEvent::*;

    let to = match (from, event) {
        (Idle, Triggered) => Detecting,
        (Detecting, NoChange) => Idle,
        (Detecting, Changed) => Building,
        (Detecting, DetectFailed) => Failed,
        (Building, Built) => Publishing,
        (Building, BuiltWithoutPublish) => Idle,
        (Building, BuildFailed) => Failed,
        (Publishing, Published) => Idle,
        (Publishing, PublishFailed) => Failed,
        (Detecting | Building | Publishing, TimedOut) => Failed,
        _ => {
            return Err(PipelineError::InvalidTransition {
                from: from.to_string(),
                event: event.to_string(),
            })
        }
    };
    Ok(to)
}

/// State machine that records every state it passes through.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state visited, starting with the initial `Idle`.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Apply `event`, returning `(from, to)`.
    pub fn apply(&mut self, event: StageEvent) -> Result<(PipelineState, PipelineState)> {
        let from = self.state;
        let to = next_state(from, event)?;
        self.state = to;
        self.history.push(to);
        Ok((from, to))
    }

    pub fn visited(&self, state: PipelineState) -> bool {
        self.history.contains(&state)
    }
}
