//! Image rebuild decision and build invocation.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::UNIX_EPOCH;

use crate::error::{LauncherError, Result};
use crate::identity::HostIdentity;
use crate::stage::BuildContext;
use crate::paths;

/// Locate podman up front so every later step can assume it exists.
pub fn podman_bin() -> Result<PathBuf> {
    which::which("podman").map_err(|_| LauncherError::PodmanNotFound)
}

/// Three-way rebuild decision: rebuild when the image is missing, when the
/// build definition is newer than the image, or when the cache is
/// explicitly ignored. Any one condition is sufficient.
///
/// Timestamps are unix seconds; when either side is unknown the comparison
/// is skipped and the existing image is kept.
pub fn should_build(
    no_cache: bool,
    image_exists: bool,
    definition_mtime: Option<i64>,
    image_created: Option<i64>,
) -> bool {
    if no_cache {
        return true;
    }
    if !image_exists {
        return true;
    }
    match (definition_mtime, image_created) {
        (Some(def), Some(img)) => def > img,
        _ => false,
    }
}

pub fn image_exists(podman: &Path) -> bool {
    Command::new(podman)
        .args(["image", "exists", paths::IMAGE_NAME])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Creation time of the existing image as unix seconds, if inspectable.
pub fn image_created_unix(podman: &Path) -> Option<i64> {
    let output = Command::new(podman)
        .args([
            "image",
            "inspect",
            paths::IMAGE_NAME,
            "--format",
            "{{.Created.Unix}}",
        ])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}

/// Modification time of the build definition as unix seconds.
///
/// The Dockerfile ships embedded in this binary, so the executable's own
/// mtime is the definition's mtime: a newer binary may carry a newer
/// Dockerfile, while re-runs of the same binary don't force rebuilds.
pub fn definition_mtime_unix() -> Option<i64> {
    let exe = std::env::current_exe().ok()?;
    let modified = exe.metadata().ok()?.modified().ok()?;
    modified
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs() as i64)
}

/// Run `podman build` against the staged build context, streaming build
/// output to the terminal. The staged artifacts are consumed here as build
/// inputs; the caller scrubs them whether or not the build succeeds.
pub fn build_image(
    podman: &Path,
    ctx: &BuildContext,
    identity: &HostIdentity,
    no_cache: bool,
) -> Result<()> {
    let mut cmd = Command::new(podman);
    cmd.arg("build")
        .arg("-f")
        .arg(ctx.dockerfile())
        .args(["--build-arg", &format!("USER_ID={}", identity.uid)])
        .args(["--build-arg", &format!("GROUP_ID={}", identity.gid)])
        .args(["--build-arg", &format!("USER_NAME={}", identity.username)])
        .args(["-t", paths::IMAGE_NAME]);
    if no_cache {
        cmd.arg("--no-cache");
    }
    cmd.arg(ctx.dir());

    let status = cmd
        .status()
        .map_err(|e| LauncherError::BuildFailed(e.to_string()))?;
    if !status.success() {
        return Err(LauncherError::BuildFailed(format!(
            "podman build exited with {status}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
