//! Site generation via an external static-site generator.

use docgate_core::{
    emit_tool_finished, PipelineError, Result, ToolInvocation, ToolOutput, ToolRunner,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::PipelineConfig;

/// Output of a successful build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Directory holding the generated site.
    pub artifact_dir: PathBuf,

    /// Captured generator output.
    pub tool: ToolOutput,
}

/// Runs the generator in the source directory and checks its output.
pub struct SiteBuilder {
    runner: Arc<dyn ToolRunner>,
    command: Vec<String>,
    source_dir: PathBuf,
    output_dir: PathBuf,
    timeout_secs: u64,
}

impl SiteBuilder {
    pub fn new(
        runner: Arc<dyn ToolRunner>,
        command: Vec<String>,
        source_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            runner,
            command,
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            timeout_secs,
        }
    }

    pub fn from_config(runner: Arc<dyn ToolRunner>, config: &PipelineConfig) -> Self {
        Self::new(
            runner,
            config.generator.clone(),
            config.resolved_source_dir(),
            config.resolved_output_dir(),
            config.build_timeout_secs,
        )
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    /// Invoke the generator once.
    ///
    /// Nonzero exit, a spawn failure or a missing output directory is
    /// `BuildFailed`; exceeding the build timeout is `Timeout`.
    pub async fn build(&self) -> Result<BuildOutput> {
        let invocation = ToolInvocation::from_command("build", &self.command)
            .ok_or_else(|| PipelineError::Config("generator command is empty".to_string()))?
            .cwd(&self.source_dir)
            .timeout_secs(self.timeout_secs);

        info!(
            command = %invocation.display_command(),
            cwd = %self.source_dir.display(),
            "Running site generator"
        );

        let tool = match self.runner.run(&invocation).await {
            Ok(output) => output,
            Err(PipelineError::Io(e)) => {
                return Err(PipelineError::BuildFailed {
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: e.to_string(),
                })
            }
            Err(e) => return Err(e),
        };
        emit_tool_finished(&invocation.label, tool.exit_code, tool.duration_ms);

        if !tool.passed() {
            return Err(PipelineError::BuildFailed {
                exit_code: tool.exit_code,
                stdout: tool.stdout,
                stderr: tool.stderr,
            });
        }

        if !self.output_dir.is_dir() {
            return Err(PipelineError::BuildFailed {
                exit_code: tool.exit_code,
                stdout: tool.stdout,
                stderr: format!(
                    "generator exited successfully but produced no output at {}",
                    self.output_dir.display()
                ),
            });
        }

        Ok(BuildOutput {
            artifact_dir: self.output_dir.clone(),
            tool,
        })
    }
}
