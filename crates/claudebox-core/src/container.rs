//! Container teardown and launch.
//!
//! One named container per image: any prior instance is stopped and
//! removed before a new one starts, so the name never refers to two
//! containers at once.

use std::path::Path;
use std::process::{Command, Stdio};
use std::str::FromStr;

use crate::error::{LauncherError, Result};
use crate::identity::HostIdentity;
use crate::paths;

// ---------------------------------------------------------------------------
// PermissionMode
// ---------------------------------------------------------------------------

/// Permission mode forwarded to the in-container `claude` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    Default,
    AcceptEdits,
    Plan,
    BypassPermissions,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::Plan => "plan",
            PermissionMode::BypassPermissions => "bypassPermissions",
        }
    }
}

impl FromStr for PermissionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "default" => Ok(PermissionMode::Default),
            "acceptEdits" => Ok(PermissionMode::AcceptEdits),
            "plan" => Ok(PermissionMode::Plan),
            "bypassPermissions" => Ok(PermissionMode::BypassPermissions),
            other => Err(format!(
                "unknown permission mode '{other}' (expected one of: default, acceptEdits, plan, bypassPermissions)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// RunSpec
// ---------------------------------------------------------------------------

/// Everything the launch step needs to start the container.
pub struct RunSpec<'a> {
    pub identity: &'a HostIdentity,
    pub mount_path: &'a Path,
    /// One-shot message; `None` means an interactive session.
    pub message: Option<&'a str>,
    pub permission_mode: Option<PermissionMode>,
}

/// Stop and remove any prior container with our fixed name.
///
/// Best-effort and idempotent: teardown errors are ignored, a stopped
/// container still gets the `rm`.
pub fn remove_existing(podman: &Path) {
    let exists = Command::new(podman)
        .args(["container", "exists", paths::CONTAINER_NAME])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if !exists {
        return;
    }
    let _ = Command::new(podman)
        .args(["stop", paths::CONTAINER_NAME])
        .output();
    let _ = Command::new(podman)
        .args(["rm", "-f", paths::CONTAINER_NAME])
        .output();
}

/// Argument vector for `podman run`, pure so the shape is testable.
///
/// In one-shot mode the assistant argv is appended directly (no shell):
/// the message travels as a single argument, and `--dangerously-skip-permissions`
/// applies unless an explicit permission mode was requested.
pub fn run_args(spec: &RunSpec<'_>) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-it".to_string(),
        "--name".to_string(),
        paths::CONTAINER_NAME.to_string(),
        "--hostname".to_string(),
        paths::CONTAINER_HOSTNAME.to_string(),
        "--user".to_string(),
        format!("{}:{}", spec.identity.uid, spec.identity.gid),
        "--volume".to_string(),
        format!(
            "{}:{}:Z",
            spec.mount_path.display(),
            paths::container_workdir(&spec.identity.username)
        ),
        "--userns=keep-id".to_string(),
        paths::IMAGE_NAME.to_string(),
    ];

    if let Some(message) = spec.message {
        args.push("claude".to_string());
        match spec.permission_mode {
            Some(mode) => {
                args.push("--permission-mode".to_string());
                args.push(mode.as_str().to_string());
            }
            None => args.push("--dangerously-skip-permissions".to_string()),
        }
        args.push("-p".to_string());
        args.push(message.to_string());
        args.push("--output-format".to_string());
        args.push("stream-json".to_string());
        args.push("--verbose".to_string());
    }

    args
}

/// Start the container with stdio attached and wait for it to exit.
///
/// Async so the caller can race it against `ctrl_c` and still run
/// workspace cleanup after an interrupt.
pub async fn run(podman: &Path, spec: &RunSpec<'_>) -> Result<std::process::ExitStatus> {
    let status = tokio::process::Command::new(podman)
        .args(run_args(spec))
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| LauncherError::ContainerFailed(e.to_string()))?;
    Ok(status)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
