//! Git integration utilities for resolving revisions and listing changes.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::domain::error::{PipelineError, Result};
use crate::domain::revision::{ChangeSet, RevisionPair};

/// Top-level directory of the work tree containing `dir`, or `None` when
/// `dir` is not inside one (or git cannot be run).
pub fn work_tree_root(dir: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(dir)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!root.is_empty()).then(|| PathBuf::from(root))
}

/// Resolve `revision` to a full commit SHA.
///
/// Fails with `RevisionUnavailable` when git is missing, the directory is not
/// a repository, or the revision does not name a commit.
pub fn resolve_revision(repo_dir: &Path, revision: &str) -> Result<String> {
    let unavailable = |reason: String| PipelineError::RevisionUnavailable {
        revision: revision.to_string(),
        reason,
    };

    if revision.trim().is_empty() {
        return Err(unavailable("empty revision".to_string()));
    }

    let commitish = format!("{revision}^{{commit}}");
    let output = Command::new("git")
        .args(["rev-parse", "--verify", "--quiet", &commitish])
        .current_dir(repo_dir)
        .output()
        .map_err(|e| unavailable(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(unavailable(format!(
            "git rev-parse failed: {}",
            stderr.trim()
        )));
    }

    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if sha.is_empty() {
        return Err(unavailable("git rev-parse returned empty output".to_string()));
    }

    Ok(sha)
}

/// List the paths that differ between the two revisions of `pair`.
///
/// Both revisions are resolved first, so a bad revision is reported by name.
pub fn diff_name_only(repo_dir: &Path, pair: &RevisionPair) -> Result<ChangeSet> {
    let base = resolve_revision(repo_dir, &pair.base)?;
    let head = resolve_revision(repo_dir, &pair.head)?;

    let output = Command::new("git")
        .args(["diff", "--name-only", "--no-renames", &base, &head])
        .current_dir(repo_dir)
        .output()
        .map_err(|e| PipelineError::RevisionUnavailable {
            revision: pair.to_string(),
            reason: format!("failed to run git: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::RevisionUnavailable {
            revision: pair.to_string(),
            reason: format!("git diff failed: {}", stderr.trim()),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(ChangeSet::new(stdout.lines()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::process::Command as StdCommand;

    fn run_git(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_git_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["commit", "--allow-empty", "-m", "initial"]);
        dir
    }

    fn commit_file(repo_dir: &Path, rel: &str, content: &str) {
        let path = repo_dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        run_git(repo_dir, &["add", rel]);
        run_git(repo_dir, &["commit", "-m", &format!("touch {rel}")]);
    }

    #[test]
    fn resolve_head_returns_40_hex_chars() {
        let repo = make_git_repo();
        let sha = resolve_revision(repo.path(), "HEAD").unwrap();
        assert_eq!(sha.len(), 40, "SHA should be 40 hex chars, got: {sha}");
        assert!(sha.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn resolve_revision_fails_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_revision(dir.path(), "HEAD");
        assert!(matches!(
            result,
            Err(PipelineError::RevisionUnavailable { .. })
        ));
    }

    #[test]
    fn work_tree_root_found_from_subdirectory() {
        let repo = make_git_repo();
        let nested = repo.path().join("docs/src");
        std::fs::create_dir_all(&nested).unwrap();

        let root = work_tree_root(&nested).expect("inside a work tree");
        assert_eq!(
            root.canonicalize().unwrap(),
            repo.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn work_tree_root_none_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(work_tree_root(dir.path()).is_none());
    }

    #[test]
    fn diff_name_only_lists_changed_paths() {
        let repo = make_git_repo();
        let base = resolve_revision(repo.path(), "HEAD").unwrap();
        commit_file(repo.path(), "docs/intro.md", "# Intro\n");
        commit_file(repo.path(), "src/main.rs", "fn main() {}\n");

        let changes = diff_name_only(repo.path(), &RevisionPair::new(base, "HEAD")).unwrap();
        assert_eq!(
            changes.iter().collect::<Vec<_>>(),
            vec!["docs/intro.md", "src/main.rs"]
        );
        assert!(changes.touches("docs/"));
    }

    #[test]
    fn diff_name_only_unknown_revision_is_unavailable() {
        let repo = make_git_repo();
        let err = diff_name_only(repo.path(), &RevisionPair::new("nope", "HEAD")).unwrap_err();
        match err {
            PipelineError::RevisionUnavailable { revision, .. } => assert_eq!(revision, "nope"),
            other => panic!("expected RevisionUnavailable, got {other:?}"),
        }
    }
}
