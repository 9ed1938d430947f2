//! Pipeline configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file) yields a working docs pipeline.

use docgate_core::{PipelineError, PublishTarget, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "docgate.toml";

/// Full pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pipeline name; part of the lease key.
    pub pipeline: String,

    /// Branch whose pushes are eligible for publishing.
    pub primary_branch: String,

    /// Path prefix whose modification triggers a build.
    pub watch_prefix: String,

    /// Repository root used for diffing.
    pub repo_dir: PathBuf,

    /// Generator working directory, relative to `repo_dir` unless absolute.
    pub source_dir: PathBuf,

    /// Build output, relative to `source_dir` unless absolute.
    pub output_dir: PathBuf,

    /// Generator command (first element is the executable).
    pub generator: Vec<String>,

    /// Generator timeout in seconds (0 = no limit).
    pub build_timeout_secs: u64,

    /// Wall-clock limit for a whole run in seconds (0 = no limit).
    pub run_timeout_secs: u64,

    pub publish: PublishConfig,

    pub lease: LeaseConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pipeline: "docs".to_string(),
            primary_branch: "main".to_string(),
            watch_prefix: "docs/".to_string(),
            repo_dir: PathBuf::from("."),
            source_dir: PathBuf::from("docs"),
            output_dir: PathBuf::from("book"),
            generator: vec!["mdbook".to_string(), "build".to_string()],
            build_timeout_secs: 600,
            run_timeout_secs: 1800,
            publish: PublishConfig::default(),
            lease: LeaseConfig::default(),
        }
    }
}

/// How build output is published.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PublishKind {
    /// Commit to a branch of a remote repository and push.
    GitBranch,
    /// Copy into a local directory.
    Directory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PublishConfig {
    pub kind: PublishKind,

    /// Branch name for `git_branch`, directory path for `directory`.
    pub target: String,

    /// Remote name or URL to push to.
    pub remote: String,

    /// Keep target files that the build output does not contain.
    pub preserve_existing: bool,

    /// Write an empty `.nojekyll` marker at the target root.
    pub nojekyll: bool,

    /// Environment variable holding the push token.
    pub token_env: String,

    pub commit_author_name: String,

    pub commit_author_email: String,

    /// Timeout for each git command in seconds (0 = no limit).
    pub git_timeout_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            kind: PublishKind::GitBranch,
            target: "gh-pages".to_string(),
            remote: "origin".to_string(),
            preserve_existing: true,
            nojekyll: true,
            token_env: "GITHUB_TOKEN".to_string(),
            commit_author_name: "docgate".to_string(),
            commit_author_email: "docgate@users.noreply.github.com".to_string(),
            git_timeout_secs: 300,
        }
    }
}

/// What happens when another run already holds the lease.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Fail the new run immediately.
    Reject,
    /// Wait for the lease until the run timeout elapses.
    Queue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LeaseConfig {
    /// Directory holding lease lock files.
    pub dir: PathBuf,

    pub on_overlap: OverlapPolicy,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().join("docgate-leases"),
            on_overlap: OverlapPolicy::Reject,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Reject configurations no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.trim().is_empty() {
            return Err(PipelineError::Config("pipeline name is empty".to_string()));
        }
        if self.primary_branch.trim().is_empty() {
            return Err(PipelineError::Config("primary branch is empty".to_string()));
        }
        if self.generator.first().map_or(true, |exe| exe.trim().is_empty()) {
            return Err(PipelineError::Config("generator command is empty".to_string()));
        }
        if self.publish.target.trim().is_empty() {
            return Err(PipelineError::Config("publish target is empty".to_string()));
        }
        Ok(())
    }

    /// Generator working directory.
    pub fn resolved_source_dir(&self) -> PathBuf {
        self.repo_dir.join(&self.source_dir)
    }

    /// Directory the generator writes to.
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.resolved_source_dir().join(&self.output_dir)
    }

    pub fn publish_target(&self) -> PublishTarget {
        PublishTarget::new(&self.publish.target, self.publish.preserve_existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.primary_branch, "main");
        assert_eq!(config.watch_prefix, "docs/");
        assert_eq!(config.publish.target, "gh-pages");
        assert!(config.publish.preserve_existing);
        assert_eq!(config.lease.on_overlap, OverlapPolicy::Reject);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            watch_prefix = "site/"
            generator = ["zola", "build"]

            [publish]
            kind = "directory"
            target = "/srv/www"
            preserve_existing = false
            "#,
        )
        .unwrap();

        assert_eq!(config.watch_prefix, "site/");
        assert_eq!(config.generator, vec!["zola", "build"]);
        assert_eq!(config.publish.kind, PublishKind::Directory);
        assert!(!config.publish.preserve_existing);
        assert_eq!(config.publish.token_env, "GITHUB_TOKEN");
        assert_eq!(config.primary_branch, "main");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = PipelineConfig::from_toml_str("watch_prefix = [").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::load_or_default(&dir.path().join("docgate.toml")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = PipelineConfig::default();
        let rendered = config.to_toml_string().unwrap();
        let back = PipelineConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_validate_rejects_empty_generator() {
        let config = PipelineConfig {
            generator: vec![],
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_resolved_dirs() {
        let config = PipelineConfig {
            repo_dir: PathBuf::from("/repo"),
            ..PipelineConfig::default()
        };
        assert_eq!(config.resolved_source_dir(), PathBuf::from("/repo/docs"));
        assert_eq!(config.resolved_output_dir(), PathBuf::from("/repo/docs/book"));
    }
}
