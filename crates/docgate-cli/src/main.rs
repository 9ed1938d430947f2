//! docgate - change-gated documentation build and publish
//!
//! ## Commands
//!
//! - `run`: evaluate a trigger, detect doc changes, build and publish
//! - `detect`: report whether the watched prefix changed between two revisions
//! - `config`: print the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, Level};

use docgate_ci::{
    write_report_json, ChangeDetector, GitDiffProvider, OverlapPolicy, Pipeline, PipelineConfig,
    PublishKind, DEFAULT_CONFIG_FILE,
};
use docgate_core::{resolve_revision, work_tree_root, EventKind, RevisionPair, TriggerEvent};

/// Exit status of `detect` when nothing under the watched prefix changed.
const EXIT_NO_CHANGE: u8 = 2;

#[derive(Parser)]
#[command(name = "docgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build and publish documentation only when it changed", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines (and a JSON report from `run`)
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file; defaults apply when it does not exist
    #[arg(short, long, global = true, env = "DOCGATE_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Commands,
}

/// Flags and `DOCGATE_*` variables that take precedence over the file.
#[derive(clap::Args, Debug, Default)]
struct ConfigOverrides {
    /// Repository root
    #[arg(long, global = true, env = "DOCGATE_REPO_DIR")]
    repo_dir: Option<PathBuf>,

    /// Branch whose pushes publish
    #[arg(long, global = true, env = "DOCGATE_PRIMARY_BRANCH")]
    primary_branch: Option<String>,

    /// Path prefix that triggers a build
    #[arg(long, global = true, env = "DOCGATE_WATCH_PREFIX")]
    watch_prefix: Option<String>,

    /// Publish target (branch name or directory)
    #[arg(long, global = true, env = "DOCGATE_TARGET")]
    target: Option<String>,

    /// Publish mechanism: git_branch or directory
    #[arg(long, global = true, env = "DOCGATE_PUBLISH_KIND", value_parser = parse_publish_kind)]
    publish_kind: Option<PublishKind>,

    /// Wait for a running pipeline on the same branch instead of failing
    #[arg(long, global = true, env = "DOCGATE_QUEUE")]
    queue: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for one trigger
    Run {
        /// Trigger event (push, pull_request, manual)
        #[arg(long, env = "GITHUB_EVENT_NAME", default_value = "manual")]
        event: EventKind,

        /// Branch the event concerns (the base branch for pull requests)
        #[arg(long, env = "DOCGATE_BRANCH")]
        branch: Option<String>,

        /// Base revision of the comparison
        #[arg(long, default_value = "HEAD~1")]
        base: String,

        /// Head revision of the comparison
        #[arg(long, default_value = "HEAD")]
        head: String,

        /// Write the JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Check whether watched paths changed between two revisions
    Detect {
        #[arg(long, default_value = "HEAD~1")]
        base: String,

        #[arg(long, default_value = "HEAD")]
        head: String,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    docgate_core::init_tracing(cli.json, level);

    let config = load_config(&cli.config, &cli.overrides)?;
    debug!(config = %cli.config.display(), "Loaded configuration");

    match cli.command {
        Commands::Run {
            event,
            branch,
            base,
            head,
            report,
        } => {
            let branch = branch
                .or_else(|| branch_from_env(event, |key| std::env::var(key).ok()))
                .context("No branch given; pass --branch or set GITHUB_REF_NAME")?;
            let revisions = RevisionPair::new(
                resolve_or_keep(&config.repo_dir, base),
                resolve_or_keep(&config.repo_dir, head),
            );
            let trigger = TriggerEvent::new(event, branch, revisions);
            cmd_run(config, &trigger, report.as_deref(), cli.json).await
        }
        Commands::Detect { base, head } => cmd_detect(&config, RevisionPair::new(base, head)).await,
        Commands::Config => cmd_config(&config),
    }
}

fn parse_publish_kind(value: &str) -> std::result::Result<PublishKind, String> {
    match value {
        "git_branch" | "git-branch" => Ok(PublishKind::GitBranch),
        "directory" | "dir" => Ok(PublishKind::Directory),
        other => Err(format!("unknown publish kind: {other}")),
    }
}

/// Load the config file (or defaults) and apply overrides.
fn load_config(path: &Path, overrides: &ConfigOverrides) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load_or_default(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    apply_overrides(&mut config, overrides);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn apply_overrides(config: &mut PipelineConfig, overrides: &ConfigOverrides) {
    if let Some(repo_dir) = &overrides.repo_dir {
        config.repo_dir = repo_dir.clone();
    }
    if let Some(branch) = &overrides.primary_branch {
        config.primary_branch = branch.clone();
    }
    if let Some(prefix) = &overrides.watch_prefix {
        config.watch_prefix = prefix.clone();
    }
    if let Some(target) = &overrides.target {
        config.publish.target = target.clone();
    }
    if let Some(kind) = overrides.publish_kind {
        config.publish.kind = kind;
    }
    if overrides.queue {
        config.lease.on_overlap = OverlapPolicy::Queue;
    }
}

/// Pin a symbolic revision (`HEAD`, `HEAD~1`) to its commit SHA.
///
/// Unresolvable revisions are kept as given; detection reports them as
/// `RevisionUnavailable`.
fn resolve_or_keep(repo_dir: &Path, revision: String) -> String {
    resolve_revision(repo_dir, &revision).unwrap_or(revision)
}

/// Branch from CI environment: the PR base branch, else the pushed ref.
fn branch_from_env(event: EventKind, var: impl Fn(&str) -> Option<String>) -> Option<String> {
    let non_empty = |key: &str| var(key).filter(|value| !value.trim().is_empty());
    match event {
        EventKind::PullRequest => {
            non_empty("GITHUB_BASE_REF").or_else(|| non_empty("GITHUB_REF_NAME"))
        }
        _ => non_empty("GITHUB_REF_NAME"),
    }
}

async fn cmd_run(
    config: PipelineConfig,
    trigger: &TriggerEvent,
    report_path: Option<&Path>,
    json: bool,
) -> Result<ExitCode> {
    let pipeline = Pipeline::from_config(config).context("Failed to set up pipeline")?;
    let report = pipeline
        .run(trigger)
        .await
        .context("Pipeline run aborted")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }

    if let Some(path) = report_path {
        write_report_json(path, &report)?;
        println!("Report written to {}", path.display());
    }

    Ok(if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn cmd_detect(config: &PipelineConfig, revisions: RevisionPair) -> Result<ExitCode> {
    let root = work_tree_root(&config.repo_dir).with_context(|| {
        format!("{} is not inside a git work tree", config.repo_dir.display())
    })?;
    debug!(root = %root.display(), "Detecting changes");

    let provider = Arc::new(GitDiffProvider::new(config.repo_dir.clone()));
    let detector = ChangeDetector::new(provider, config.watch_prefix.clone());
    let detection = detector
        .detect(&revisions)
        .await
        .context("Change detection failed")?;

    if !detection.relevant() {
        println!(
            "No changes under {} ({} path(s) changed in {})",
            detector.prefix(),
            detection.changes.len(),
            revisions
        );
        return Ok(ExitCode::from(EXIT_NO_CHANGE));
    }

    println!(
        "{} watched path(s) changed in {}:",
        detection.matched.len(),
        revisions
    );
    for path in &detection.matched {
        println!("  {}", path);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_config(config: &PipelineConfig) -> Result<ExitCode> {
    print!("{}", config.to_toml_string()?);
    Ok(ExitCode::SUCCESS)
}
