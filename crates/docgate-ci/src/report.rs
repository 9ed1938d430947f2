//! Run reports.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use docgate_core::{PublishSummary, TriggerEvent};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::state::PipelineState;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The trigger predicate rejected the event.
    NotTriggered,
    /// Nothing under the watched prefix changed.
    NoChange,
    /// Built, but the trigger may not publish.
    Built,
    Published,
    Failed,
}

impl Outcome {
    pub fn name(&self) -> &'static str {
        match self {
            Outcome::NotTriggered => "not_triggered",
            Outcome::NoChange => "no_change",
            Outcome::Built => "built",
            Outcome::Published => "published",
            Outcome::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Generator run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub artifact_dir: Option<PathBuf>,
    pub exit_code: i32,
    pub duration_ms: u64,
    /// Captured generator stderr (kept for failed builds).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

/// Error captured from a failed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub kind: String,
    pub message: String,
}

/// Everything a run did, for humans and machines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub pipeline: String,
    pub started_at: DateTime<Utc>,
    pub trigger: TriggerEvent,
    pub publish_eligible: bool,
    pub states: Vec<PipelineState>,
    pub matched_paths: Vec<String>,
    pub build: Option<BuildSummary>,
    pub publish: Option<PublishSummary>,
    pub outcome: Outcome,
    pub error: Option<RunError>,
    pub duration_ms: u64,
}

impl RunReport {
    /// Final state of the run.
    pub fn final_state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Idle)
    }

    /// Whether the run ended in `Idle` (exit status zero).
    pub fn success(&self) -> bool {
        self.final_state() == PipelineState::Idle
    }

    pub fn visited(&self, state: PipelineState) -> bool {
        self.states.contains(&state)
    }

    /// Human-readable summary lines.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Run ID: {}\n", self.run_id));
        out.push_str(&format!(
            "Trigger: {} on {} ({})\n",
            self.trigger.kind, self.trigger.branch, self.trigger.revisions
        ));
        out.push_str(&format!(
            "Status: {}\n",
            if self.success() { "✓ OK" } else { "✗ FAILED" }
        ));
        out.push_str(&format!("Outcome: {}\n", self.outcome));
        out.push_str(&format!(
            "States: {}\n",
            self.states
                .iter()
                .map(PipelineState::name)
                .collect::<Vec<_>>()
                .join(" → ")
        ));
        if !self.matched_paths.is_empty() {
            out.push_str(&format!("Changed: {} watched path(s)\n", self.matched_paths.len()));
            for path in &self.matched_paths {
                out.push_str(&format!("  - {}\n", path));
            }
        }
        if let Some(build) = &self.build {
            out.push_str(&format!(
                "Build: exit code {} ({}ms)\n",
                build.exit_code, build.duration_ms
            ));
        }
        if let Some(publish) = &self.publish {
            out.push_str(&format!(
                "Publish: {} ({} copied, {} unchanged, {} removed)\n",
                publish.target, publish.copied, publish.unchanged, publish.removed
            ));
        }
        if let Some(error) = &self.error {
            out.push_str(&format!("Error [{}]: {}\n", error.kind, error.message));
        }
        out.push_str(&format!("Duration: {}ms\n", self.duration_ms));
        out
    }
}

/// Write the report as pretty JSON.
pub fn write_report_json(path: &Path, report: &RunReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize run report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgate_core::{EventKind, RevisionPair};

    fn report(states: Vec<PipelineState>, outcome: Outcome) -> RunReport {
        RunReport {
            run_id: "run-1".to_string(),
            pipeline: "docs".to_string(),
            started_at: Utc::now(),
            trigger: TriggerEvent::new(EventKind::Push, "main", RevisionPair::new("a", "b")),
            publish_eligible: true,
            states,
            matched_paths: vec!["docs/intro.md".to_string()],
            build: Some(BuildSummary {
                artifact_dir: Some(PathBuf::from("docs/book")),
                exit_code: 0,
                duration_ms: 12,
                stderr: String::new(),
            }),
            publish: None,
            outcome,
            error: None,
            duration_ms: 20,
        }
    }

    #[test]
    fn test_success_follows_final_state() {
        let ok = report(
            vec![PipelineState::Idle, PipelineState::Detecting, PipelineState::Idle],
            Outcome::NoChange,
        );
        assert!(ok.success());

        let failed = report(
            vec![PipelineState::Idle, PipelineState::Detecting, PipelineState::Failed],
            Outcome::Failed,
        );
        assert!(!failed.success());
        assert_eq!(failed.final_state(), PipelineState::Failed);
    }

    #[test]
    fn test_render_text() {
        let text = report(
            vec![
                PipelineState::Idle,
                PipelineState::Detecting,
                PipelineState::Building,
                PipelineState::Idle,
            ],
            Outcome::Built,
        )
        .render_text();
        assert!(text.contains("Outcome: built"));
        assert!(text.contains("idle → detecting → building → idle"));
        assert!(text.contains("docs/intro.md"));
    }

    #[test]
    fn test_write_report_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let original = report(vec![PipelineState::Idle], Outcome::NotTriggered);
        write_report_json(&path, &original).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["outcome"], "not_triggered");
        assert_eq!(parsed["trigger"]["kind"], "push");
        assert_eq!(parsed["states"][0], "idle");
    }
}
