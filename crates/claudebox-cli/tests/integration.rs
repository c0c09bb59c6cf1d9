use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn claudebox(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("claudebox").unwrap();
    cmd.current_dir(dir.path());
    cmd
}

// ---------------------------------------------------------------------------
// Flag surface
// ---------------------------------------------------------------------------

#[test]
fn help_exits_zero_and_lists_flags() {
    let dir = TempDir::new().unwrap();
    claudebox(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-cache"))
        .stdout(predicate::str::contains("--worktree-branch"))
        .stdout(predicate::str::contains("--keep-worktree"))
        .stdout(predicate::str::contains("--no-worktree"))
        .stdout(predicate::str::contains("--worktree-path"))
        .stdout(predicate::str::contains("--permission-mode"));
}

#[test]
fn short_help_exits_zero() {
    let dir = TempDir::new().unwrap();
    claudebox(&dir).arg("-h").assert().success();
}

#[test]
fn unknown_flag_exits_one() {
    let dir = TempDir::new().unwrap();
    claudebox(&dir)
        .arg("--definitely-not-a-flag")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--definitely-not-a-flag"));
}

#[test]
fn invalid_permission_mode_exits_one() {
    let dir = TempDir::new().unwrap();
    claudebox(&dir)
        .args(["--permission-mode", "yolo"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("permission mode"));
}

// ---------------------------------------------------------------------------
// Fatal precondition paths
// ---------------------------------------------------------------------------

#[test]
fn missing_podman_is_fatal() {
    let dir = TempDir::new().unwrap();
    // An empty PATH makes the podman probe fail before anything else runs.
    claudebox(&dir)
        .env("PATH", "")
        .arg("--no-worktree")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("podman not found"));
}
