//! Roadmap document scanning and roadmap placeholders.

use crate::fsutil::{is_file_entry, read_text_lossy, relative_slash_path, walk_entry};
use crate::model::label::{PLACEHOLDER_LABEL, RECOVERED_LABEL};
use crate::model::record::{find_ids, NewRecord, RecordId};
use log::warn;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const ROADMAP_MISSING_LABEL: &str = "roadmap-missing";

const ROADMAP_JSON: &str = "docs/roadmap.json";

/// Identifiers referenced by roadmap files, with the files citing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoadmapScan {
    /// Id → relative source paths, in scan order.
    pub sources: BTreeMap<RecordId, Vec<String>>,
    pub unreadable: Vec<String>,
}

/// Sorted `*roadmap*.md` files under `root` (skipping `.git`), then
/// `docs/roadmap.json` when present.
pub fn find_roadmap_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git")
        .filter_map(|entry| walk_entry(entry, "recovery"))
        .filter(is_file_entry)
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            name.contains("roadmap") && name.ends_with(".md")
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    let json = root.join(ROADMAP_JSON);
    if json.is_file() {
        files.push(json);
    }
    files
}

/// Scans every roadmap file; unreadable files are recorded, not fatal.
pub fn scan_roadmaps(root: &Path) -> RoadmapScan {
    let mut scan = RoadmapScan::default();
    for path in find_roadmap_files(root) {
        let rel = relative_slash_path(root, &path);
        let text = match read_text_lossy(&path) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    "event=roadmap_read module=recovery status=error path={} error={}",
                    rel, err
                );
                scan.unreadable.push(rel);
                continue;
            }
        };
        let ids: BTreeSet<RecordId> = find_ids(&text).into_iter().collect();
        for id in ids {
            scan.sources.entry(id).or_default().push(rel.clone());
        }
    }
    scan
}

pub fn placeholder_title(id: &str, sources: &[String]) -> String {
    let primary = sources.first().map(String::as_str).unwrap_or("roadmap");
    format!("[roadmap-recovery] Missing roadmap bead {id} ({primary})")
}

pub fn placeholder_description(id: &str, sources: &[String]) -> String {
    let unique: BTreeSet<&str> = sources.iter().map(String::as_str).collect();
    let lines = unique
        .iter()
        .map(|source| format!("- {source}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Recovered placeholder bead created because this ID appears in roadmap docs but is \
         missing from the active Beads database.\n\n\
         Bead ID: {id}\n\
         Sources:\n\
         {lines}"
    )
}

pub fn placeholder_record(id: &str, sources: &[String]) -> NewRecord {
    NewRecord::task(
        id,
        placeholder_title(id, sources),
        placeholder_description(id, sources),
        &[RECOVERED_LABEL, PLACEHOLDER_LABEL, ROADMAP_MISSING_LABEL],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_collects_ids_per_file_and_skips_git() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::create_dir_all(root.join(".git").join("refs")).unwrap();
        fs::write(
            root.join("docs").join("core-roadmap.md"),
            "- IV-A1 ship\n- iv-a1 again\n- iv-b2.1 later\n",
        )
        .unwrap();
        fs::write(root.join("roadmap.md"), "iv-b2.1\n").unwrap();
        fs::write(root.join(".git").join("refs").join("roadmap.md"), "iv-zz\n").unwrap();
        fs::write(root.join("docs").join("notes.md"), "iv-c3\n").unwrap();
        fs::write(root.join("docs").join("roadmap.json"), "{\"id\": \"iv-d4\"}").unwrap();

        let scan = scan_roadmaps(root);
        assert_eq!(
            scan.sources.keys().cloned().collect::<Vec<_>>(),
            vec!["iv-a1", "iv-b2.1", "iv-d4"]
        );
        assert_eq!(scan.sources["iv-a1"], vec!["docs/core-roadmap.md"]);
        assert_eq!(
            scan.sources["iv-b2.1"],
            vec!["docs/core-roadmap.md", "roadmap.md"]
        );
        assert_eq!(scan.sources["iv-d4"], vec!["docs/roadmap.json"]);
        assert!(scan.unreadable.is_empty());
    }

    #[test]
    fn title_uses_first_source_or_default() {
        assert_eq!(
            placeholder_title("iv-a1", &["b.md".to_string(), "a.md".to_string()]),
            "[roadmap-recovery] Missing roadmap bead iv-a1 (b.md)"
        );
        assert_eq!(
            placeholder_title("iv-a1", &[]),
            "[roadmap-recovery] Missing roadmap bead iv-a1 (roadmap)"
        );
    }

    #[test]
    fn description_lists_sorted_unique_sources() {
        let sources = vec!["b.md".to_string(), "a.md".to_string(), "b.md".to_string()];
        let description = placeholder_description("iv-a1", &sources);
        assert!(description.ends_with("Bead ID: iv-a1\nSources:\n- a.md\n- b.md"));
    }
}
