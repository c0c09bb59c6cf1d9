use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Fixed names
// ---------------------------------------------------------------------------

/// Name of the image produced by the build step.
pub const IMAGE_NAME: &str = "claude-code-ubuntu";
/// Name of the singleton container. Any prior instance with this name is
/// torn down before a new one starts.
pub const CONTAINER_NAME: &str = "claude-code-dev";
/// Hostname visible inside the container.
pub const CONTAINER_HOSTNAME: &str = "claude-dev";

/// Filename the credentials copy takes inside the build context. Must match
/// the `COPY` line in the embedded Dockerfile.
pub const STAGED_CREDENTIALS: &str = ".credentials.json";
/// Filename the merged config takes inside the build context.
pub const STAGED_CONFIG: &str = ".claude.json";
pub const DOCKERFILE_NAME: &str = "claude-code-ubuntu.dockerfile";

// ---------------------------------------------------------------------------
// Host-side paths
// ---------------------------------------------------------------------------

/// `$HOME/.claude/.credentials.json`, the host's Claude Code credentials.
pub fn host_credentials_path(home: &Path) -> PathBuf {
    home.join(".claude").join(".credentials.json")
}

/// `$HOME/.claude.json`, the host's Claude Code configuration.
pub fn host_config_path(home: &Path) -> PathBuf {
    home.join(".claude.json")
}

/// The fixed in-container working directory the workspace is bound to.
pub fn container_workdir(username: &str) -> String {
    format!("/home/{username}/dev")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_paths() {
        let home = Path::new("/home/alice");
        assert_eq!(
            host_credentials_path(home),
            PathBuf::from("/home/alice/.claude/.credentials.json")
        );
        assert_eq!(
            host_config_path(home),
            PathBuf::from("/home/alice/.claude.json")
        );
    }

    #[test]
    fn workdir_embeds_username() {
        assert_eq!(container_workdir("alice"), "/home/alice/dev");
    }
}
