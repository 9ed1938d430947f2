//! Pipeline orchestration: trigger → lease → detect → build → publish.

use chrono::Utc;
use docgate_core::{
    emit_run_finished, emit_run_started, emit_stage_failed, emit_transition, evaluate_trigger,
    run_span, PipelineError, ProcessRunner, Result, ToolRunner, TriggerDecision, TriggerEvent,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::builder::SiteBuilder;
use crate::config::PipelineConfig;
use crate::detector::{ChangeDetector, DiffProvider, GitDiffProvider};
use crate::lease::{LeaseKey, LeaseManager};
use crate::publisher::{publisher_from_config, PublishRequest, Publisher};
use crate::report::{BuildSummary, Outcome, RunError, RunReport};
use crate::state::{StageEvent, StateMachine};

/// Mutable bookkeeping for one run.
struct RunContext {
    run_id: String,
    machine: StateMachine,
    matched_paths: Vec<String>,
    build: Option<BuildSummary>,
    publish: Option<docgate_core::PublishSummary>,
    outcome: Outcome,
    error: Option<RunError>,
}

impl RunContext {
    fn new(run_id: String) -> Self {
        Self {
            run_id,
            machine: StateMachine::new(),
            matched_paths: Vec::new(),
            build: None,
            publish: None,
            outcome: Outcome::NotTriggered,
            error: None,
        }
    }

    fn advance(&mut self, event: StageEvent) -> Result<()> {
        let (from, to) = self.machine.apply(event)?;
        emit_transition(&self.run_id, from.name(), to.name(), event.name());
        Ok(())
    }

    /// Record a stage failure and move to `Failed`.
    ///
    /// Errors that are not stage failures are handed back unchanged.
    fn fail(&mut self, err: PipelineError) -> Result<()> {
        let Some(event) = StageEvent::for_error(&err) else {
            return Err(err);
        };
        emit_stage_failed(&self.run_id, self.machine.state().name(), &err);
        if let PipelineError::BuildFailed {
            exit_code, stderr, ..
        } = &err
        {
            let build = self.build.get_or_insert(BuildSummary {
                artifact_dir: None,
                exit_code: *exit_code,
                duration_ms: 0,
                stderr: String::new(),
            });
            build.exit_code = *exit_code;
            build.stderr = stderr.clone();
        }
        self.error = Some(RunError {
            kind: err.kind().to_string(),
            message: err.to_string(),
        });
        self.outcome = Outcome::Failed;
        self.advance(event)
    }
}

/// The change-gated build-and-publish pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    detector: ChangeDetector,
    builder: SiteBuilder,
    publisher: Arc<dyn Publisher>,
    leases: LeaseManager,
}

impl Pipeline {
    /// Assemble a pipeline from explicit components.
    pub fn new(
        config: PipelineConfig,
        diff_provider: Arc<dyn DiffProvider>,
        runner: Arc<dyn ToolRunner>,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self> {
        config.validate()?;
        let detector = ChangeDetector::new(diff_provider, config.watch_prefix.clone());
        let builder = SiteBuilder::from_config(runner, &config);
        let leases = LeaseManager::new(config.lease.dir.clone());
        Ok(Self {
            config,
            detector,
            builder,
            publisher,
            leases,
        })
    }

    /// Production pipeline: git diffs, subprocess generator, configured publisher.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let runner: Arc<dyn ToolRunner> = Arc::new(ProcessRunner::new());
        let diff_provider = Arc::new(GitDiffProvider::new(config.repo_dir.clone()));
        let publisher = publisher_from_config(&config, runner.clone());
        Self::new(config, diff_provider, runner, publisher)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// Execute one run for `trigger`.
    ///
    /// Stage failures (`RevisionUnavailable`, `BuildFailed`, `PublishFailed`,
    /// `Timeout`) end the run in `Failed` and are captured in the report.
    /// Lease contention and other infrastructure errors are returned as `Err`.
    pub async fn run(&self, trigger: &TriggerEvent) -> Result<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        let span = run_span(&run_id, &self.config.pipeline);
        self.execute(run_id, trigger).instrument(span).await
    }

    async fn execute(&self, run_id: String, trigger: &TriggerEvent) -> Result<RunReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        let decision = evaluate_trigger(trigger, &self.config.primary_branch);
        let mut ctx = RunContext::new(run_id.clone());

        if !decision.run {
            info!(
                trigger = %trigger.kind,
                branch = %trigger.branch,
                "Trigger does not start a run"
            );
            return Ok(self.finish(ctx, trigger, decision, started_at, start));
        }

        emit_run_started(
            &run_id,
            trigger.kind.name(),
            &trigger.branch,
            &trigger.revisions.to_string(),
        );

        // Only runs that may publish contend for the target.
        let limit = run_limit(self.config.run_timeout_secs);
        let lease = if decision.publish {
            let key = LeaseKey::new(&self.config.pipeline, &trigger.branch);
            Some(
                self.leases
                    .acquire(&key, self.config.lease.on_overlap, limit)
                    .await?,
            )
        } else {
            None
        };

        ctx.advance(StageEvent::Triggered)?;
        let outcome = {
            let stages = self.run_stages(trigger, decision, &mut ctx);
            match limit {
                Some(limit) => {
                    let remaining = limit.saturating_sub(start.elapsed());
                    tokio::time::timeout(remaining, stages)
                        .await
                        .unwrap_or_else(|_| {
                            Err(PipelineError::Timeout {
                                stage: "run".to_string(),
                                limit_secs: limit.as_secs(),
                            })
                        })
                }
                None => stages.await,
            }
        };

        match outcome {
            Ok(()) => {}
            Err(err) if err.is_stage_failure() => ctx.fail(err)?,
            Err(err) => return Err(err),
        }

        drop(lease);
        Ok(self.finish(ctx, trigger, decision, started_at, start))
    }

    async fn run_stages(
        &self,
        trigger: &TriggerEvent,
        decision: TriggerDecision,
        ctx: &mut RunContext,
    ) -> Result<()> {
        let detection = self.detector.detect(&trigger.revisions).await?;
        if !detection.relevant() {
            info!(
                prefix = %self.detector.prefix(),
                changed = detection.changes.len(),
                "No watched paths changed"
            );
            ctx.outcome = Outcome::NoChange;
            return ctx.advance(StageEvent::NoChange);
        }
        ctx.matched_paths = detection.matched;
        ctx.advance(StageEvent::Changed)?;

        let built = self.builder.build().await?;
        ctx.build = Some(BuildSummary {
            artifact_dir: Some(built.artifact_dir.clone()),
            exit_code: built.tool.exit_code,
            duration_ms: built.tool.duration_ms,
            stderr: String::new(),
        });

        if !decision.publish {
            info!(trigger = %trigger.kind, "Build only, trigger is not eligible to publish");
            ctx.outcome = Outcome::Built;
            return ctx.advance(StageEvent::BuiltWithoutPublish);
        }
        ctx.advance(StageEvent::Built)?;

        let request = PublishRequest {
            artifact_dir: built.artifact_dir,
            target: self.config.publish_target(),
            revision: trigger.revisions.head.clone(),
        };
        info!(publisher = self.publisher.name(), target = %request.target, "Publishing");
        let summary = self.publisher.publish(&request).await?;
        ctx.publish = Some(summary);
        ctx.outcome = Outcome::Published;
        ctx.advance(StageEvent::Published)
    }

    fn finish(
        &self,
        ctx: RunContext,
        trigger: &TriggerEvent,
        decision: TriggerDecision,
        started_at: chrono::DateTime<Utc>,
        start: Instant,
    ) -> RunReport {
        let duration_ms = start.elapsed().as_millis() as u64;
        let report = RunReport {
            run_id: ctx.run_id,
            pipeline: self.config.pipeline.clone(),
            started_at,
            trigger: trigger.clone(),
            publish_eligible: decision.publish,
            states: ctx.machine.history().to_vec(),
            matched_paths: ctx.matched_paths,
            build: ctx.build,
            publish: ctx.publish,
            outcome: ctx.outcome,
            error: ctx.error,
            duration_ms,
        };
        emit_run_finished(
            &report.run_id,
            report.outcome.name(),
            duration_ms,
            report.success(),
        );
        report
    }
}

fn run_limit(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
