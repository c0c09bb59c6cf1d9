mod launch;

use clap::error::ErrorKind;
use clap::Parser;
use claudebox_core::container::PermissionMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "claudebox",
    about = "Launch a Podman container with Claude Code pre-installed",
    version
)]
struct Cli {
    /// Run `claude -p MESSAGE` non-interactively after the container starts, then exit
    #[arg(short, long)]
    message: Option<String>,

    /// Force rebuild of the container image
    #[arg(long)]
    no_cache: bool,

    /// Permission mode for one-shot mode (default, acceptEdits, plan, bypassPermissions)
    #[arg(long)]
    permission_mode: Option<PermissionMode>,

    /// Create the worktree from this branch/commit (default: current HEAD)
    #[arg(long)]
    worktree_branch: Option<String>,

    /// Keep the worktree after the container stops
    #[arg(long)]
    keep_worktree: bool,

    /// Mount the current directory instead of creating a worktree
    #[arg(long)]
    no_worktree: bool,

    /// Use an existing worktree at this path (disables cleanup)
    #[arg(long)]
    worktree_path: Option<PathBuf>,
}

fn main() {
    // Usage errors exit 1; --help/--version print and exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => std::process::exit(0),
                _ => std::process::exit(1),
            }
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    if let Err(e) = launch::run(cli.into()) {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

impl From<Cli> for launch::LaunchArgs {
    fn from(cli: Cli) -> Self {
        launch::LaunchArgs {
            message: cli.message,
            no_cache: cli.no_cache,
            permission_mode: cli.permission_mode,
            worktree: claudebox_core::WorktreeOptions {
                disabled: cli.no_worktree,
                branch: cli.worktree_branch,
                keep: cli.keep_worktree,
                existing: cli.worktree_path,
            },
        }
    }
}
