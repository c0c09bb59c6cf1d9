//! Input resolution: flag values are either literal text or paths to
//! markdown files.

use std::path::{Path, PathBuf};

use crate::error::{ArchitectError, Result};

/// Resolve a flag value: a value naming an existing `.md` file is read,
/// anything else is taken literally.
pub fn resolve_input(value: &str) -> Result<String> {
    let path = Path::new(value);
    if value.ends_with(".md") && path.exists() {
        return std::fs::read_to_string(path)
            .map_err(|e| ArchitectError::Input(format!("error reading '{value}': {e}")));
    }
    Ok(value.to_string())
}

/// Read and concatenate the `--existing` markdown files, each prefixed
/// with its path so the model can tell them apart. Every file must exist
/// and must be markdown.
pub fn combine_existing(paths: &[PathBuf]) -> Result<String> {
    let mut sections = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.exists() {
            return Err(ArchitectError::Input(format!(
                "existing file not found: {}",
                path.display()
            )));
        }
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            return Err(ArchitectError::Input(format!(
                "existing file must be a .md file: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ArchitectError::Input(format!("error reading '{}': {e}", path.display())))?;
        sections.push(format!("File: {}\n{}", path.display(), content));
    }
    Ok(sections.join("\n\n"))
}
