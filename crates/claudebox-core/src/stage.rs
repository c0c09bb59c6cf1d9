//! Per-run build context: the extracted Dockerfile plus the two staged
//! configuration artifacts the build consumes.
//!
//! Credential material is copied, never referenced: the copy lives inside a
//! run-owned temp directory and only between staging and the end of the
//! build step. [`BuildContext::scrub`] deletes both staged files as soon as
//! the build finishes (success or failure); dropping the context removes
//! the whole directory, so nothing survives the process on any exit path.
//! The per-run directory also keeps concurrent invocations from clobbering
//! each other's staged files.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::merge_config;
use crate::error::{LauncherError, Result};
use crate::{io, paths};

pub struct BuildContext {
    dir: TempDir,
    dockerfile: PathBuf,
    credentials: PathBuf,
    config: PathBuf,
}

impl BuildContext {
    /// Create the build context directory and extract the embedded
    /// Dockerfile into it.
    pub fn create() -> Result<Self> {
        let dir = TempDir::with_prefix("claudebox-build-")?;
        let dockerfile = dir.path().join(paths::DOCKERFILE_NAME);
        io::atomic_write(&dockerfile, DOCKERFILE_CONTENT.as_bytes())?;
        let credentials = dir.path().join(paths::STAGED_CREDENTIALS);
        let config = dir.path().join(paths::STAGED_CONFIG);
        Ok(Self {
            dir,
            dockerfile,
            credentials,
            config,
        })
    }

    /// Directory handed to `podman build` as the build context.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn dockerfile(&self) -> &Path {
        &self.dockerfile
    }

    /// Copy the host credential file into the build context.
    ///
    /// Fails with [`LauncherError::MissingCredentials`] before any build
    /// side effect when the host has no credential file.
    pub fn stage_credentials(&self, home: &Path) -> Result<()> {
        let src = paths::host_credentials_path(home);
        if !src.exists() {
            return Err(LauncherError::MissingCredentials(src));
        }
        std::fs::copy(&src, &self.credentials)?;
        Ok(())
    }

    /// Merge the host config against the embedded template and write the
    /// result into the build context.
    ///
    /// A missing or unparsable host config is fatal: the container would
    /// otherwise start unauthenticated.
    pub fn stage_config(&self, home: &Path, username: &str) -> Result<()> {
        let host_path = paths::host_config_path(home);
        if !host_path.exists() {
            return Err(LauncherError::MissingHostConfig(format!(
                "{} not found",
                host_path.display()
            )));
        }
        let raw = std::fs::read_to_string(&host_path)?;
        let host: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            LauncherError::MissingHostConfig(format!(
                "failed to parse {}: {e}",
                host_path.display()
            ))
        })?;
        let template: serde_json::Value = serde_json::from_str(CONFIG_TEMPLATE)?;

        let merged = merge_config(&template, &host, username)?;
        io::atomic_write(&self.config, serde_json::to_string_pretty(&merged)?.as_bytes())
    }

    /// Delete the staged credential copy and merged config.
    ///
    /// Called unconditionally once the build step is over; the artifacts
    /// are build inputs only and must not linger on the host's disk. The
    /// context's `Drop` removes the whole directory as a backstop.
    pub fn scrub(&self) {
        for staged in [&self.credentials, &self.config] {
            if staged.exists() {
                if let Err(e) = std::fs::remove_file(staged) {
                    tracing::warn!(path = %staged.display(), "failed to remove staged file: {e}");
                }
            }
        }
    }

    #[cfg(test)]
    fn staged_paths(&self) -> (&Path, &Path) {
        (&self.credentials, &self.config)
    }
}

// ---------------------------------------------------------------------------
// Embedded build definition
// ---------------------------------------------------------------------------

/// The image definition. `USER_ID`/`GROUP_ID`/`USER_NAME` arrive as build
/// args; the two staged artifacts are COPY'd into the image layer rather
/// than bind-mounted at runtime, so the resulting image is self-contained
/// per user.
const DOCKERFILE_CONTENT: &str = r#"FROM ubuntu:latest

RUN apt-get update && apt-get install -y \
    curl \
    ca-certificates \
    gnupg \
    lsb-release \
    gh \
    ripgrep \
    && rm -rf /var/lib/apt/lists/*

# Node.js 20.x (LTS)
RUN curl -fsSL https://deb.nodesource.com/setup_20.x | bash - \
    && apt-get install -y nodejs

ARG USER_ID=1000
ARG GROUP_ID=1000
ARG USER_NAME=user

# Non-root group and user matching the host identity
RUN groupadd -g $GROUP_ID $USER_NAME && \
	useradd -m -s /bin/bash -u $USER_ID -g $GROUP_ID $USER_NAME

RUN mkdir -p /home/$USER_NAME/.claude && \
    mkdir -p /home/$USER_NAME/dev

COPY .credentials.json /home/$USER_NAME/.claude/
COPY .claude.json /home/$USER_NAME/

RUN chown -R $USER_NAME:$USER_NAME /home/$USER_NAME/.claude && \
    chown $USER_NAME:$USER_NAME /home/$USER_NAME/.claude.json && \
    chown -R $USER_NAME:$USER_NAME /home/$USER_NAME/dev

USER $USER_NAME

ENV PATH="/home/$USER_NAME/.npm-global/bin:$PATH"

RUN npm config set prefix ~/.npm-global

RUN npm install -g @anthropic-ai/claude-code

RUN npm install -g @playwright/mcp

WORKDIR /home/$USER_NAME/dev

CMD ["/bin/bash"]
"#;

/// Container config defaults. `userID` and `oauthAccount` are filled from
/// the host config; `$USER_NAME` in project keys is resolved at stage time.
const CONFIG_TEMPLATE: &str = r#"{
	"numStartups": 1,
	"installMethod": "unknown",
	"autoUpdates": true,
	"tipsHistory": {
		"new-user-warmup": 1
	},
	"userID": "",
	"projects": {
		"/home/$USER_NAME/dev": {
			"allowedTools": [],
			"history": [],
			"mcpContextUris": [],
			"mcpServers": {},
			"enabledMcpjsonServers": [],
			"disabledMcpjsonServers": [],
			"hasTrustDialogAccepted": true,
			"projectOnboardingSeenCount": 1,
			"hasClaudeMdExternalIncludesApproved": false,
			"hasClaudeMdExternalIncludesWarningShown": false
		}
	},
	"oauthAccount": {
	},
	"hasCompletedOnboarding": true,
	"mcpServers": {
		"context7": {
			"type": "sse",
			"url": "https://mcp.context7.com/sse"
		},
		"playwright": {
			"command": "npx",
			"args": [
				"@playwright/mcp@latest"
			]
		}
	}
}
"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_home(config: Option<&str>, credentials: Option<&str>) -> TempDir {
        let home = TempDir::new().unwrap();
        if let Some(c) = credentials {
            let dir = home.path().join(".claude");
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join(".credentials.json"), c).unwrap();
        }
        if let Some(c) = config {
            std::fs::write(home.path().join(".claude.json"), c).unwrap();
        }
        home
    }

    #[test]
    fn create_extracts_dockerfile() {
        let ctx = BuildContext::create().unwrap();
        let content = std::fs::read_to_string(ctx.dockerfile()).unwrap();
        assert!(content.contains("FROM ubuntu:latest"));
        assert!(content.contains("COPY .credentials.json"));
    }

    #[test]
    fn embedded_template_is_valid_json() {
        let v: serde_json::Value = serde_json::from_str(CONFIG_TEMPLATE).unwrap();
        assert!(v["projects"]
            .as_object()
            .unwrap()
            .contains_key("/home/$USER_NAME/dev"));
    }

    #[test]
    fn stage_credentials_copies_file() {
        let home = fake_home(None, Some(r#"{"token":"t"}"#));
        let ctx = BuildContext::create().unwrap();
        ctx.stage_credentials(home.path()).unwrap();
        let (creds, _) = ctx.staged_paths();
        assert_eq!(std::fs::read_to_string(creds).unwrap(), r#"{"token":"t"}"#);
    }

    #[test]
    fn stage_credentials_missing_is_fatal() {
        let home = fake_home(None, None);
        let ctx = BuildContext::create().unwrap();
        assert!(matches!(
            ctx.stage_credentials(home.path()),
            Err(LauncherError::MissingCredentials(_))
        ));
    }

    #[test]
    fn stage_config_merges_host_fields() {
        let home = fake_home(
            Some(r#"{"userID":"u-42","oauthAccount":{"emailAddress":"a@b.c"}}"#),
            None,
        );
        let ctx = BuildContext::create().unwrap();
        ctx.stage_config(home.path(), "alice").unwrap();

        let (_, config) = ctx.staged_paths();
        let merged: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(config).unwrap()).unwrap();
        assert_eq!(merged["userID"], "u-42");
        assert_eq!(merged["oauthAccount"]["emailAddress"], "a@b.c");
        assert!(merged["projects"]
            .as_object()
            .unwrap()
            .contains_key("/home/alice/dev"));
    }

    #[test]
    fn stage_config_missing_host_is_fatal() {
        let home = fake_home(None, None);
        let ctx = BuildContext::create().unwrap();
        assert!(matches!(
            ctx.stage_config(home.path(), "alice"),
            Err(LauncherError::MissingHostConfig(_))
        ));
    }

    #[test]
    fn stage_config_unparsable_host_is_fatal() {
        let home = fake_home(Some("not json"), None);
        let ctx = BuildContext::create().unwrap();
        assert!(matches!(
            ctx.stage_config(home.path(), "alice"),
            Err(LauncherError::MissingHostConfig(_))
        ));
    }

    #[test]
    fn scrub_removes_staged_files() {
        let home = fake_home(Some(r#"{"userID":"u"}"#), Some("{}"));
        let ctx = BuildContext::create().unwrap();
        ctx.stage_credentials(home.path()).unwrap();
        ctx.stage_config(home.path(), "alice").unwrap();

        ctx.scrub();
        let (creds, config) = ctx.staged_paths();
        assert!(!creds.exists());
        assert!(!config.exists());
        // Dockerfile stays: it contains no secrets and the context
        // directory goes away on drop anyway.
        assert!(ctx.dockerfile().exists());
    }

    #[test]
    fn scrub_is_idempotent() {
        let ctx = BuildContext::create().unwrap();
        ctx.scrub();
        ctx.scrub();
    }

    #[test]
    fn drop_removes_context_dir() {
        let ctx = BuildContext::create().unwrap();
        let dir = ctx.dir().to_path_buf();
        drop(ctx);
        assert!(!dir.exists());
    }
}
