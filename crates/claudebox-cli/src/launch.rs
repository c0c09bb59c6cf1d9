//! The launch lifecycle, start to finish.
//!
//! Strictly sequential: identity → workspace → staging → (conditional)
//! build → teardown → run. The container run is raced against Ctrl-C so an
//! interrupt still reaches the worktree cleanup, which also covers the
//! normal and error exits.

use anyhow::Context;
use claudebox_core::container::{self, PermissionMode, RunSpec};
use claudebox_core::{image, paths, BuildContext, HostIdentity, Workspace, WorktreeOptions};
use std::path::Path;

pub struct LaunchArgs {
    pub message: Option<String>,
    pub no_cache: bool,
    pub permission_mode: Option<PermissionMode>,
    pub worktree: WorktreeOptions,
}

pub fn run(args: LaunchArgs) -> anyhow::Result<()> {
    println!("Claude Code container launcher");

    let podman = image::podman_bin()?;
    let identity = HostIdentity::resolve()?;
    let home = home::home_dir().context("could not determine home directory")?;
    let cwd = std::env::current_dir()?;

    let mut workspace = Workspace::provision(&args.worktree, &cwd)?;
    if args.worktree.disabled {
        println!("Using current directory (no worktree)");
    } else if workspace.mount_path() != cwd.as_path() {
        println!("Workspace at: {}", workspace.mount_path().display());
    }

    let result = launch(&podman, &identity, &home, &args, &workspace);

    // Cleanup runs on success, error, and interrupt alike; the guard's
    // Drop is only a backstop.
    if let Err(e) = workspace.cleanup() {
        tracing::warn!("worktree cleanup failed: {e}");
    }
    result
}

fn launch(
    podman: &Path,
    identity: &HostIdentity,
    home: &Path,
    args: &LaunchArgs,
    workspace: &Workspace,
) -> anyhow::Result<()> {
    // Stage credentials and the merged config into the per-run build
    // context. Both fail fast before any build side effect.
    println!("Preparing Claude configuration files...");
    let ctx = BuildContext::create()?;
    ctx.stage_credentials(home)?;
    ctx.stage_config(home, &identity.username)?;

    // Build when the three-way check fires; staged files are scrubbed
    // whether the build succeeds, fails, or is skipped.
    let exists = image::image_exists(podman);
    let created = if exists {
        image::image_created_unix(podman)
    } else {
        None
    };
    if image::should_build(args.no_cache, exists, image::definition_mtime_unix(), created) {
        println!("Building Claude Code Ubuntu image...");
        let built = image::build_image(podman, &ctx, identity, args.no_cache);
        ctx.scrub();
        built?;
    } else {
        ctx.scrub();
    }

    // The container name is a singleton: tear down any prior instance.
    container::remove_existing(podman);

    let spec = RunSpec {
        identity,
        mount_path: workspace.mount_path(),
        message: args.message.as_deref(),
        permission_mode: args.permission_mode,
    };

    println!("Starting Claude Code container...");
    println!("  container: {}", paths::CONTAINER_NAME);
    println!(
        "  workdir:   {}",
        paths::container_workdir(&identity.username)
    );
    println!("  mounted:   {}", spec.mount_path.display());
    if workspace.cleanup_enabled() {
        println!("  the worktree will be removed after the container stops");
    }

    let rt = tokio::runtime::Runtime::new()?;
    let status = rt.block_on(async {
        tokio::select! {
            res = container::run(podman, &spec) => res.map(Some),
            _ = tokio::signal::ctrl_c() => Ok(None),
        }
    })?;

    let Some(status) = status else {
        anyhow::bail!("interrupted");
    };

    println!("Container stopped");
    match workspace.publish_changes() {
        Ok(true) => println!("Worktree changes committed"),
        Ok(false) => {}
        Err(e) => tracing::warn!("failed to publish worktree changes: {e}"),
    }

    // One-shot mode surfaces the assistant's exit status; an interactive
    // session ending is not a failure.
    if spec.message.is_some() && !status.success() {
        anyhow::bail!("claude exited with {status}");
    }
    Ok(())
}
