//! `claudebox-core` — the container launch lifecycle.
//!
//! The launcher runs one strictly sequential pass per invocation:
//!
//! ```text
//! HostIdentity::resolve()
//!     │
//!     ▼
//! Workspace::provision()   ← git worktree (default) or the caller's cwd
//!     │
//!     ▼
//! BuildContext::create()   ← per-run temp dir: Dockerfile + staged
//!     │                      credentials + merged config
//!     ▼
//! image::build_image()     ← only when the three-way rebuild check fires;
//!     │                      staged files are scrubbed either way
//!     ▼
//! container::run()         ← singleton container, prior instance torn down
//!     │
//!     ▼
//! WorktreeGuard::cleanup() ← every exit path, idempotent
//! ```
//!
//! Credential material exists on disk only between staging and the end of
//! the build step, inside a directory owned by this run. The worktree is
//! the one piece of state that survives past a single function call, so it
//! is held in a guard whose cleanup is safe to invoke more than once.

pub mod config;
pub mod container;
pub mod error;
pub mod identity;
pub mod image;
pub mod io;
pub mod paths;
pub mod stage;
pub mod worktree;

pub use error::{LauncherError, Result};
pub use identity::HostIdentity;
pub use stage::BuildContext;
pub use worktree::{Workspace, WorktreeOptions};
