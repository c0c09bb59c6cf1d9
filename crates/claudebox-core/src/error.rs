use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("could not resolve host identity: {0}")]
    IdentityUnresolved(String),

    #[error("credentials file not found: {0}")]
    MissingCredentials(PathBuf),

    #[error("host configuration unusable: {0}")]
    MissingHostConfig(String),

    #[error("not inside a git repository (use --no-worktree to mount the current directory)")]
    NotAGitRepository,

    #[error("failed to create worktree: {0}")]
    WorktreeCreationFailed(String),

    #[error("podman not found on PATH")]
    PodmanNotFound,

    #[error("image build failed: {0}")]
    BuildFailed(String),

    #[error("container run failed: {0}")]
    ContainerFailed(String),

    #[error("git command failed: {0}")]
    Git(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LauncherError>;
