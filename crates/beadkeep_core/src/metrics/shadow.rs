//! Shadow-routing log parsing.

use crate::fsutil::{is_file_entry, read_text_lossy, walk_entry};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

const LOG_PREFIX: &str = "routing-shadow-";
const LOG_SUFFIX: &str = ".log";

static SHADOW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[B2-shadow\] complexity=(C\d) would change model: (\w+) → (\w+)")
        .expect("shadow regex must compile")
});

/// One projected model change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowEntry {
    pub complexity: String,
    pub base_model: String,
    pub projected_model: String,
}

/// Entries matched in one log text.
pub fn parse_shadow_text(text: &str) -> Vec<ShadowEntry> {
    text.lines()
        .filter_map(|line| SHADOW_RE.captures(line))
        .map(|captures| ShadowEntry {
            complexity: captures[1].to_string(),
            base_model: captures[2].to_string(),
            projected_model: captures[3].to_string(),
        })
        .collect()
}

/// Repo name → entries for every `routing-shadow-<repo>.log` in `dir`.
///
/// A missing directory yields no repos; unreadable files are skipped.
pub fn parse_shadow_logs(dir: &Path) -> BTreeMap<String, Vec<ShadowEntry>> {
    let mut logs = BTreeMap::new();
    if !dir.is_dir() {
        return logs;
    }
    let files = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| walk_entry(entry, "metrics"))
        .filter(is_file_entry);
    for entry in files {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(repo) = name
            .strip_prefix(LOG_PREFIX)
            .and_then(|rest| rest.strip_suffix(LOG_SUFFIX))
        else {
            continue;
        };
        match read_text_lossy(entry.path()) {
            Ok(text) => {
                logs.insert(repo.to_string(), parse_shadow_text(&text));
            }
            Err(err) => warn!(
                "event=shadow_log_read module=metrics status=error file={} error={}",
                name, err
            ),
        }
    }
    logs
}
