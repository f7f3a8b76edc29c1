//! Small file-system helpers shared by corpus scanners.

use log::warn;
use std::path::{Component, Path};
use walkdir::DirEntry;

/// `path` relative to `root`, `/`-separated; falls back to the full path.
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Reads a file as UTF-8, replacing invalid sequences.
pub fn read_text_lossy(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Passes through a walk entry; a failed one is logged and dropped.
pub fn walk_entry(entry: walkdir::Result<DirEntry>, module: &str) -> Option<DirEntry> {
    match entry {
        Ok(entry) => Some(entry),
        Err(err) => {
            warn!(
                "event=walk_entry module={} status=error path={} error={}",
                module,
                err.path().map(|path| path.display().to_string()).unwrap_or_default(),
                err
            );
            None
        }
    }
}

/// Whether `entry` is a file, following a symlink to its target.
pub fn is_file_entry(entry: &DirEntry) -> bool {
    entry.path().is_file()
}
