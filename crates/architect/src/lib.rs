//! `architect` — generate technical design documents with the Anthropic
//! Messages API.
//!
//! Two API calls per run: a small one that names the system (the slug used
//! in output filenames) and a streaming one that produces the design
//! document itself. The response is split into tagged sections and written
//! under `specs/`.
//!
//! This crate is deliberately independent of the launcher crates: the two
//! tools share a repository and nothing else.

pub mod api;
pub mod error;
pub mod inputs;
pub mod outputs;
pub mod prompt;

pub use error::{ArchitectError, Result};
