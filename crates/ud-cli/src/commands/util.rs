//! Shared utilities for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;

/// Formats minutes as `"{hours}h {minutes}m"`, always showing both parts.
pub fn format_minutes(minutes: u64) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Reads a whole text file.
pub fn read_text(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Reads and deserializes a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = read_text(path)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Overwrites `path` with `contents`, creating the parent directory if needed.
pub fn write_text(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
