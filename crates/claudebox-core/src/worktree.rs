//! Disposable git-worktree workspaces.
//!
//! The default workspace is a fresh worktree of the current HEAD, created
//! in a run-owned temp directory and removed on exit. Provisioning failure
//! is non-fatal: the run degrades to mounting the caller's directory, since
//! the underlying goal (having *a* workspace) is still satisfiable.
//! At most one worktree is provisioned per run; its location is tracked in
//! a single [`WorktreeGuard`] handle, never rediscovered by scanning.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{LauncherError, Result};

// ---------------------------------------------------------------------------
// Options / Workspace
// ---------------------------------------------------------------------------

/// Workspace flags, lifted straight from the CLI surface.
#[derive(Debug, Default, Clone)]
pub struct WorktreeOptions {
    /// `--no-worktree`: mount the invocation directory directly.
    pub disabled: bool,
    /// `--worktree-branch`: source reference (default: current HEAD).
    pub branch: Option<String>,
    /// `--keep-worktree`: suppress cleanup.
    pub keep: bool,
    /// `--worktree-path`: reuse an existing worktree, caller owns cleanup.
    pub existing: Option<PathBuf>,
}

/// The filesystem tree bound into the container as its working directory.
pub enum Workspace {
    /// The caller's directory, used directly. No lifecycle management.
    Direct(PathBuf),
    /// A provisioned (or reused) worktree.
    Worktree(WorktreeGuard),
}

impl Workspace {
    /// Resolve the workspace for this run.
    ///
    /// Worktree mode requires `cwd` to be under version control
    /// ([`LauncherError::NotAGitRepository`] otherwise, before any side
    /// effect); a failure to *create* the worktree degrades to direct mode
    /// with a warning instead of aborting the run.
    pub fn provision(opts: &WorktreeOptions, cwd: &Path) -> Result<Self> {
        if opts.disabled {
            return Ok(Workspace::Direct(cwd.to_path_buf()));
        }

        if let Some(path) = &opts.existing {
            if path.exists() {
                return Ok(Workspace::Worktree(WorktreeGuard {
                    repo: cwd.to_path_buf(),
                    path: path.clone(),
                    base: None,
                    created: false,
                    cleanup_enabled: false,
                    done: false,
                }));
            }
            tracing::warn!(
                path = %path.display(),
                "worktree path does not exist; provisioning a fresh worktree"
            );
        }

        if !is_git_repo(cwd) {
            return Err(LauncherError::NotAGitRepository);
        }

        let reference = opts.branch.as_deref().unwrap_or("HEAD");
        match create_worktree(cwd, reference, !opts.keep) {
            Ok(guard) => Ok(Workspace::Worktree(guard)),
            Err(e) => {
                tracing::warn!("{e}; using current directory instead");
                Ok(Workspace::Direct(cwd.to_path_buf()))
            }
        }
    }

    /// The path bound into the container.
    pub fn mount_path(&self) -> &Path {
        match self {
            Workspace::Direct(p) => p,
            Workspace::Worktree(g) => &g.path,
        }
    }

    /// True when this run will remove the worktree on exit.
    pub fn cleanup_enabled(&self) -> bool {
        matches!(self, Workspace::Worktree(g) if g.cleanup_enabled)
    }

    /// Commit and push any changes left behind in a worktree this run
    /// created. Returns `true` when a commit was made.
    pub fn publish_changes(&self) -> Result<bool> {
        match self {
            Workspace::Direct(_) => Ok(false),
            Workspace::Worktree(g) => g.publish_changes(),
        }
    }

    /// Remove the provisioned worktree, if any. Idempotent; a no-op for
    /// direct mode, reused paths, and `--keep-worktree` runs.
    pub fn cleanup(&mut self) -> Result<()> {
        match self {
            Workspace::Direct(_) => Ok(()),
            Workspace::Worktree(g) => g.cleanup(),
        }
    }
}

// ---------------------------------------------------------------------------
// WorktreeGuard
// ---------------------------------------------------------------------------

/// Run-scoped handle to the one provisioned worktree.
pub struct WorktreeGuard {
    /// The main checkout the worktree is registered with.
    repo: PathBuf,
    /// The worktree checkout itself (the container mount).
    path: PathBuf,
    /// Backing temp directory to delete on cleanup; `None` when the caller
    /// supplied the path and owns its lifecycle.
    base: Option<PathBuf>,
    /// Whether this run created the worktree (vs. reusing a given path).
    created: bool,
    cleanup_enabled: bool,
    /// Cleanup already ran; makes repeat invocations a no-op.
    done: bool,
}

impl WorktreeGuard {
    /// Deregister the worktree and delete its backing directory.
    ///
    /// Safe to call more than once and safe when provisioning never
    /// completed: the registry is consulted before removal and the
    /// directory is only deleted if it exists.
    pub fn cleanup(&mut self) -> Result<()> {
        if self.done || !self.cleanup_enabled {
            return Ok(());
        }
        self.done = true;

        if self.is_registered() {
            let path = self.path.to_string_lossy();
            if let Err(e) = git(&self.repo, ["worktree", "remove", "--force", path.as_ref()]) {
                tracing::warn!("git worktree remove failed: {e}; deleting the directory directly");
            }
        }
        if let Some(base) = &self.base {
            if base.exists() {
                std::fs::remove_dir_all(base)?;
            }
        }
        Ok(())
    }

    fn is_registered(&self) -> bool {
        let Ok(output) = git(&self.repo, ["worktree", "list", "--porcelain"]) else {
            return false;
        };
        let canonical = self
            .path
            .canonicalize()
            .unwrap_or_else(|_| self.path.clone());
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|l| l.strip_prefix("worktree "))
            .any(|p| Path::new(p) == canonical || Path::new(p) == self.path)
    }

    /// Commit any changes in a worktree this run created and push them to
    /// `origin`, setting the upstream on first push. A push failure is a
    /// warning, not an error: the commit still exists locally.
    fn publish_changes(&self) -> Result<bool> {
        if !self.created || !self.path.exists() {
            return Ok(false);
        }
        if !self.has_changes()? {
            return Ok(false);
        }

        git(&self.path, ["add", "-A"])?;
        let msg = format!(
            "chore: claude code container changes {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        git(&self.path, ["commit", "-m", &msg])?;

        let output = git(&self.path, ["branch", "--show-current"])?;
        let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if git(&self.path, ["push", "origin", &branch]).is_err() {
            if let Err(e) = git(&self.path, ["push", "--set-upstream", "origin", &branch]) {
                tracing::warn!("failed to push worktree changes to origin/{branch}: {e}");
            }
        }
        Ok(true)
    }

    fn has_changes(&self) -> Result<bool> {
        // `diff --quiet` signals differences via a non-zero exit, so these
        // two go through the raw runner.
        let unstaged = !git_raw(&self.path, ["diff", "--quiet"])?.status.success();
        let staged = !git_raw(&self.path, ["diff", "--cached", "--quiet"])?
            .status
            .success();
        let output = git(&self.path, ["ls-files", "--others", "--exclude-standard"])?;
        let untracked = !String::from_utf8_lossy(&output.stdout).trim().is_empty();
        Ok(unstaged || staged || untracked)
    }
}

impl Drop for WorktreeGuard {
    /// Backstop for early-error paths; the launcher calls `cleanup`
    /// explicitly on its normal and interrupted exits.
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            tracing::warn!("worktree cleanup on drop failed: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Provisioning
// ---------------------------------------------------------------------------

fn is_git_repo(dir: &Path) -> bool {
    git(dir, ["rev-parse", "--git-dir"]).is_ok()
}

fn create_worktree(repo: &Path, reference: &str, cleanup_enabled: bool) -> Result<WorktreeGuard> {
    // Timestamp + pid keeps concurrent runs from colliding on the path or
    // the branch name.
    let name = format!(
        "claudebox-{}-{}",
        chrono::Utc::now().timestamp_micros(),
        std::process::id()
    );
    let base = std::env::temp_dir().join(&name);
    std::fs::create_dir_all(&base)?;
    let path = base.join("tree");

    let path_str = path.to_string_lossy();
    let result = git(
        repo,
        [
            "worktree",
            "add",
            "-b",
            name.as_str(),
            path_str.as_ref(),
            reference,
        ],
    );
    if let Err(e) = result {
        let _ = std::fs::remove_dir_all(&base);
        return Err(LauncherError::WorktreeCreationFailed(e.to_string()));
    }

    Ok(WorktreeGuard {
        repo: repo.to_path_buf(),
        path,
        base: Some(base),
        created: true,
        cleanup_enabled,
        done: false,
    })
}

// ---------------------------------------------------------------------------
// git invocation
// ---------------------------------------------------------------------------

/// Run git in `dir`, failing on a non-zero exit with stderr in the error.
fn git<I, S>(dir: &Path, args: I) -> Result<std::process::Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = git_raw(dir, args)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LauncherError::Git(stderr.trim().to_string()));
    }
    Ok(output)
}

/// Run git and hand back the output regardless of exit status. Used where
/// a non-zero exit is an answer (`diff --quiet`), not a failure.
fn git_raw<I, S>(dir: &Path, args: I) -> Result<std::process::Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .map_err(|e| LauncherError::Git(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A throwaway repo with one commit.
    fn init_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        git(dir.path(), ["init"]).unwrap();
        git(dir.path(), ["config", "user.email", "test@example.com"]).unwrap();
        git(dir.path(), ["config", "user.name", "Test"]).unwrap();
        std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();
        git(dir.path(), ["add", "-A"]).unwrap();
        git(dir.path(), ["commit", "-m", "init"]).unwrap();
        dir
    }

    fn default_opts() -> WorktreeOptions {
        WorktreeOptions::default()
    }

    #[test]
    fn disabled_mode_mounts_cwd_exactly() {
        let repo = init_repo();
        let opts = WorktreeOptions {
            disabled: true,
            ..default_opts()
        };
        let ws = Workspace::provision(&opts, repo.path()).unwrap();
        assert_eq!(ws.mount_path(), repo.path());
        assert!(!ws.cleanup_enabled());
    }

    #[test]
    fn provision_outside_repo_is_fatal() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Workspace::provision(&default_opts(), dir.path()),
            Err(LauncherError::NotAGitRepository)
        ));
    }

    #[test]
    fn provision_creates_and_cleanup_removes_worktree() {
        let repo = init_repo();
        let mut ws = Workspace::provision(&default_opts(), repo.path()).unwrap();

        let mount = ws.mount_path().to_path_buf();
        assert_ne!(mount, repo.path());
        assert!(mount.join("README.md").exists());

        let listed = git(repo.path(), ["worktree", "list", "--porcelain"]).unwrap();
        assert!(String::from_utf8_lossy(&listed.stdout).contains("claudebox-"));

        ws.cleanup().unwrap();
        assert!(!mount.exists());
        let listed = git(repo.path(), ["worktree", "list", "--porcelain"]).unwrap();
        assert!(!String::from_utf8_lossy(&listed.stdout).contains("claudebox-"));
    }

    #[test]
    fn cleanup_is_idempotent() {
        let repo = init_repo();
        let mut ws = Workspace::provision(&default_opts(), repo.path()).unwrap();
        ws.cleanup().unwrap();
        ws.cleanup().unwrap();
    }

    #[test]
    fn cleanup_without_worktree_is_a_no_op() {
        let repo = init_repo();
        let opts = WorktreeOptions {
            disabled: true,
            ..default_opts()
        };
        let mut ws = Workspace::provision(&opts, repo.path()).unwrap();
        ws.cleanup().unwrap();
        ws.cleanup().unwrap();
    }

    #[test]
    fn keep_worktree_survives_cleanup() {
        let repo = init_repo();
        let opts = WorktreeOptions {
            keep: true,
            ..default_opts()
        };
        let mut ws = Workspace::provision(&opts, repo.path()).unwrap();
        let mount = ws.mount_path().to_path_buf();

        ws.cleanup().unwrap();
        assert!(mount.exists());
        let listed = git(repo.path(), ["worktree", "list", "--porcelain"]).unwrap();
        assert!(String::from_utf8_lossy(&listed.stdout).contains("claudebox-"));

        // Not left to the guard: remove by hand so the temp dir doesn't leak.
        git(
            repo.path(),
            [
                "worktree",
                "remove",
                "--force",
                mount.to_string_lossy().as_ref(),
            ],
        )
        .unwrap();
        std::fs::remove_dir_all(mount.parent().unwrap()).unwrap();
    }

    #[test]
    fn unknown_reference_degrades_to_direct_mode() {
        let repo = init_repo();
        let opts = WorktreeOptions {
            branch: Some("does-not-exist".into()),
            ..default_opts()
        };
        let ws = Workspace::provision(&opts, repo.path()).unwrap();
        assert_eq!(ws.mount_path(), repo.path());
        assert!(!ws.cleanup_enabled());
    }

    #[test]
    fn existing_path_reused_without_cleanup() {
        let repo = init_repo();
        let external = TempDir::new().unwrap();
        let opts = WorktreeOptions {
            existing: Some(external.path().to_path_buf()),
            ..default_opts()
        };
        let mut ws = Workspace::provision(&opts, repo.path()).unwrap();
        assert_eq!(ws.mount_path(), external.path());
        assert!(!ws.cleanup_enabled());

        ws.cleanup().unwrap();
        assert!(external.path().exists());
    }

    #[test]
    fn publish_changes_commits_new_files() {
        let repo = init_repo();
        let mut ws = Workspace::provision(&default_opts(), repo.path()).unwrap();
        std::fs::write(ws.mount_path().join("new-file.txt"), "contents\n").unwrap();

        // No origin remote: the push step warns but the commit must land.
        assert!(ws.publish_changes().unwrap());
        let log = git(ws.mount_path(), ["log", "--oneline"]).unwrap();
        assert!(String::from_utf8_lossy(&log.stdout).contains("container changes"));

        ws.cleanup().unwrap();
    }

    #[test]
    fn publish_changes_without_changes_is_a_no_op() {
        let repo = init_repo();
        let mut ws = Workspace::provision(&default_opts(), repo.path()).unwrap();
        assert!(!ws.publish_changes().unwrap());
        ws.cleanup().unwrap();
    }
}
