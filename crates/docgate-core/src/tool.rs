//! External tool execution.
//!
//! Stages never shell out directly: they describe a [`ToolInvocation`] and hand
//! it to a [`ToolRunner`], which returns a typed [`ToolOutput`] with captured
//! stdout/stderr. [`ProcessRunner`] is the subprocess-backed implementation.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::domain::error::{PipelineError, Result};

/// A program to run, where, and for how long at most.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Short label used in logs and timeout errors (e.g. "build").
    pub label: String,

    /// Executable name or path.
    pub program: String,

    pub args: Vec<String>,

    /// Working directory; the current directory when `None`.
    pub cwd: Option<PathBuf>,

    /// Extra environment variables.
    pub env: Vec<(String, String)>,

    /// Timeout in seconds (0 = no limit).
    pub timeout_secs: u64,
}

impl ToolInvocation {
    pub fn new(label: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            timeout_secs: 0,
        }
    }

    /// Build an invocation from an argv-style command (first element is the
    /// executable). Returns `None` for an empty command.
    pub fn from_command(label: impl Into<String>, command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(label, program.clone()).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// The command line, for logging.
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of running a tool to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Exit code (-1 when the process was killed by a signal).
    pub exit_code: i32,

    pub stdout: String,

    pub stderr: String,

    pub duration_ms: u64,

    /// Whether the process reported success.
    pub success: bool,
}

impl ToolOutput {
    /// Whether this tool passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }
}

/// Capability interface for running external tools.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the tool to completion.
    ///
    /// A nonzero exit status is an `Ok` output with `success == false`.
    /// Failure to spawn is `PipelineError::Io`; exceeding the invocation's
    /// timeout is `PipelineError::Timeout`.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;
}

/// Runs tools as child processes with piped stdout/stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        let start = Instant::now();

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }

        let child = command.spawn().map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("failed to spawn {}: {e}", invocation.program),
            )
        })?;

        let output = if invocation.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(invocation.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| PipelineError::Timeout {
                stage: invocation.label.clone(),
                limit_secs: invocation.timeout_secs,
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        Ok(ToolOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
            success: output.status.success(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_output_passed() {
        let output = ToolOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 5,
            success: true,
        };
        assert!(output.passed());

        let failed = ToolOutput {
            exit_code: 1,
            success: false,
            ..output
        };
        assert!(!failed.passed());
    }

    #[test]
    fn test_from_command() {
        let cmd = vec!["mdbook".to_string(), "build".to_string()];
        let inv = ToolInvocation::from_command("build", &cmd).unwrap();
        assert_eq!(inv.program, "mdbook");
        assert_eq!(inv.args, vec!["build".to_string()]);
        assert_eq!(inv.display_command(), "mdbook build");

        assert!(ToolInvocation::from_command("build", &[]).is_none());
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let inv = ToolInvocation::new("echo", "echo").arg("hello").timeout_secs(30);
        let output = ProcessRunner.run(&inv).await.expect("run failed");
        assert!(output.passed());
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_run_nonzero_exit_is_ok_output() {
        let inv = ToolInvocation::new("false", "false").timeout_secs(30);
        let output = ProcessRunner.run(&inv).await.expect("run failed");
        assert!(!output.success);
        assert_ne!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn test_run_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let inv = ToolInvocation::new("ls", "ls").cwd(dir.path());
        let output = ProcessRunner.run(&inv).await.unwrap();
        assert!(output.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_run_missing_binary_is_io_error() {
        let inv = ToolInvocation::new("missing", "docgate-no-such-binary-xyz");
        let err = ProcessRunner.run(&inv).await.unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let inv = ToolInvocation::new("sleep", "sleep").arg("5").timeout_secs(1);
        let err = ProcessRunner.run(&inv).await.unwrap_err();
        match err {
            PipelineError::Timeout { stage, limit_secs } => {
                assert_eq!(stage, "sleep");
                assert_eq!(limit_secs, 1);
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }
}
