//! Response parsing and `specs/` output.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;

static PLANNING_RE: OnceLock<Regex> = OnceLock::new();
static DESIGN_RE: OnceLock<Regex> = OnceLock::new();
static UPDATED_RE: OnceLock<Regex> = OnceLock::new();

fn planning_re() -> &'static Regex {
    PLANNING_RE.get_or_init(|| {
        Regex::new(r"(?s)<architecture_planning>(.*?)</architecture_planning>").unwrap()
    })
}

fn design_re() -> &'static Regex {
    DESIGN_RE.get_or_init(|| {
        Regex::new(r"(?s)<technical_design_document>(.*?)</technical_design_document>").unwrap()
    })
}

fn updated_re() -> &'static Regex {
    UPDATED_RE.get_or_init(|| Regex::new(r"(?s)<updated_markdown>(.*?)</updated_markdown>").unwrap())
}

fn extract<'a>(re: &Regex, response: &'a str) -> Option<&'a str> {
    re.captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Split the model response into its tagged sections and write them under
/// `specs_dir`. A missing section is a warning, not a failure; the other
/// sections are still written. Returns the paths written.
pub fn save_outputs(
    specs_dir: &Path,
    response: &str,
    slug: &str,
    existing: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(specs_dir)?;
    let mut written = Vec::new();

    match extract(planning_re(), response) {
        Some(content) => {
            let path = specs_dir.join(format!("{slug}_architecture_planning.md"));
            std::fs::write(&path, content)?;
            written.push(path);
        }
        None => tracing::warn!("no architecture planning section found in response"),
    }

    match extract(design_re(), response) {
        Some(content) => {
            let path = specs_dir.join(format!("{slug}_technical_design.md"));
            std::fs::write(&path, content)?;
            written.push(path);
        }
        None => tracing::warn!("no technical design document section found in response"),
    }

    if let Some(content) = extract(updated_re(), response) {
        // One copy per input file; per-file splitting is up to the model.
        for existing_file in existing {
            let Some(name) = existing_file.file_name() else {
                continue;
            };
            let path = specs_dir.join(format!("updated_{}", name.to_string_lossy()));
            std::fs::write(&path, content)?;
            written.push(path);
        }
    }

    Ok(written)
}
