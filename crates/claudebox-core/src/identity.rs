use crate::error::{LauncherError, Result};

/// Numeric user/group ids and the username of the invoking host user.
///
/// Resolved once at startup and immutable for the run: the values are baked
/// into image build arguments and into the `--user` flag of the container,
/// so a wrong or missing value cannot be patched later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub uid: u32,
    pub gid: u32,
    pub username: String,
}

impl HostIdentity {
    /// Read the real uid/gid and `$USER` from the execution environment.
    ///
    /// There is no fallback: an undeterminable username fails the whole run.
    pub fn resolve() -> Result<Self> {
        let (uid, gid) = real_ids()?;
        Self::from_parts(uid, gid, std::env::var("USER").ok())
    }

    /// Validate raw parts into an identity. Split out from [`resolve`] so
    /// the validation is testable without touching the process environment.
    pub fn from_parts(uid: u32, gid: u32, username: Option<String>) -> Result<Self> {
        let username = username.ok_or_else(|| {
            LauncherError::IdentityUnresolved("USER environment variable is not set".into())
        })?;
        if username.is_empty() {
            return Err(LauncherError::IdentityUnresolved(
                "USER environment variable is empty".into(),
            ));
        }
        Ok(Self { uid, gid, username })
    }
}

#[cfg(unix)]
fn real_ids() -> Result<(u32, u32)> {
    // SAFETY: getuid/getgid take no arguments and cannot fail.
    let uid = unsafe { libc::getuid() };
    let gid = unsafe { libc::getgid() };
    Ok((uid, gid))
}

#[cfg(not(unix))]
fn real_ids() -> Result<(u32, u32)> {
    Err(LauncherError::IdentityUnresolved(
        "numeric uid/gid are only available on unix hosts".into(),
    ))
}
