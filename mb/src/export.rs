//! Mindmap export to JSON files

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use tracing::{debug, info};

use crate::domain::MindmapNode;

const MAX_SLUG_LEN: usize = 48;

/// Lowercase, dash-separated file stem from free text
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() { "mindmap".to_string() } else { slug.to_string() }
}

/// File name for a mindmap written at `at`
pub fn file_name(statement: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}.json", at.format("%Y%m%dT%H%M%S"), slugify(statement))
}

/// Write `mindmap` as pretty JSON under `dir`, returning the path
pub fn write_mindmap(dir: &Path, mindmap: &MindmapNode) -> Result<PathBuf> {
    debug!(dir = %dir.display(), "write_mindmap: called");
    fs::create_dir_all(dir).context(format!("Failed to create export directory {}", dir.display()))?;

    let path = dir.join(file_name(&mindmap.name, Utc::now()));
    let json = serde_json::to_string_pretty(mindmap).context("Failed to serialize mindmap")?;
    fs::write(&path, json).context(format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), "Mindmap exported");
    Ok(path)
}
