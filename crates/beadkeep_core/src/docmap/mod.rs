//! Brainstorm/plan document → record association.
//!
//! # Responsibility
//! - Extract record identifiers from markdown documents with a confidence
//!   tier (declared, inferred, inferred-sibling).
//! - Produce the ordered mapping list and its CSV audit report.
//!
//! # Invariants
//! - Documents are visited brainstorms first, then plans, each sorted by path.
//! - Sibling borrowing only uses declared identifiers.
//! - The mapping list holds each (doc_path, bead_id) pair at most once.

use crate::fsutil::{is_file_entry, read_text_lossy, relative_slash_path, walk_entry};
use crate::model::mapping::{DocKind, Mapping, MappingMode};
use crate::model::record::{cap_title, find_ids, first_id, RecordId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const BRAINSTORMS_DIR: &str = "docs/brainstorms";
pub const PLANS_DIR: &str = "docs/plans";
pub const PRDS_DIR: &str = "docs/prds";

pub const DOC_MAP_LABEL: &str = "doc-map";

pub const REPORT_HEADER: [&str; 4] = ["doc_path", "doc_kind", "bead_id", "mode"];

const TITLE_SCAN_LINES: usize = 40;
const DECLARATION_MARKER: &str = "Bead:";

static DECLARATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\*\*Bead:\*\*\s*(.+)$").expect("declaration regex must compile")
});
static DATE_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}-").expect("date prefix regex must compile"));
static HEADING_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#+\s*").expect("heading regex must compile"));

/// A corpus document could not be read.
#[derive(Debug)]
pub struct DocReadError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl Display for DocReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to read `{}`: {}", self.path.display(), self.source)
    }
}

impl Error for DocReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Identifiers referenced by one document, with their confidence tier.
///
/// Tiers are tried in order and the first non-empty one wins:
/// a `**Bead:**` line, then any line containing `Bead:`, then (when `infer`
/// is set) the first identifier anywhere in the text.
pub fn extract_ids(text: &str, infer: bool) -> Vec<(RecordId, MappingMode)> {
    let declared = |ids: Vec<RecordId>| {
        ids.into_iter()
            .map(|id| (id, MappingMode::Declared))
            .collect::<Vec<_>>()
    };

    for line in text.lines() {
        if let Some(captures) = DECLARATION_RE.captures(line.trim()) {
            let ids = find_ids(&captures[1]);
            if !ids.is_empty() {
                return declared(ids);
            }
        }
    }

    for line in text.lines() {
        if let Some((_, rhs)) = line.split_once(DECLARATION_MARKER) {
            let ids = find_ids(rhs);
            if !ids.is_empty() {
                return declared(ids);
            }
        }
    }

    if infer {
        if let Some(id) = first_id(text) {
            return vec![(id, MappingMode::Inferred)];
        }
    }
    Vec::new()
}

/// Slug shared by sibling documents: date prefix, `.md` and `-brainstorm`
/// removed.
pub fn normalize_slug(file_name: &str) -> String {
    let name = DATE_PREFIX_RE.replace(file_name, "");
    let name = name.strip_suffix(".md").unwrap_or(&*name);
    name.replace("-brainstorm", "")
}

/// `[recovered-doc] {first heading}` or the file stem, capped.
pub fn title_from_text(text: &str, stem: &str) -> String {
    let heading = text
        .lines()
        .take(TITLE_SCAN_LINES)
        .map(str::trim)
        .filter(|line| line.starts_with('#'))
        .map(|line| HEADING_PREFIX_RE.replace(line, "").trim().to_string())
        .find(|title| !title.is_empty());
    match heading {
        Some(title) => cap_title(&format!("[recovered-doc] {title}")),
        None => cap_title(&format!("[recovered-doc] {stem}")),
    }
}

pub fn title_from_doc(path: &Path) -> Result<String, DocReadError> {
    let text = read_doc(path)?;
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(title_from_text(&text, &stem))
}

pub fn placeholder_description(doc_path: &Path, kind: DocKind) -> String {
    format!(
        "Recovered placeholder bead created while mapping brainstorm/plan docs to beads.\n\n\
         - Source doc: {}\n\
         - Doc kind: {kind}\n\
         - Reason: bead ID referenced by doc was missing from current beads database.",
        doc_path.display()
    )
}

struct Doc {
    rel: String,
    file_name: String,
    text: String,
}

/// Builds the ordered, deduplicated mapping list for the corpus at `root`.
///
/// Missing corpus directories contribute no documents.
pub fn collect_mappings(root: &Path, infer: bool) -> Result<Vec<Mapping>, DocReadError> {
    let brainstorms = load_docs(root, BRAINSTORMS_DIR)?;
    let plans = load_docs(root, PLANS_DIR)?;
    let prds = load_docs(root, PRDS_DIR)?;

    let mut siblings: BTreeMap<String, BTreeSet<RecordId>> = BTreeMap::new();
    for doc in brainstorms.iter().chain(&plans).chain(&prds) {
        let declared: Vec<RecordId> = extract_ids(&doc.text, false)
            .into_iter()
            .filter(|(_, mode)| *mode == MappingMode::Declared)
            .map(|(id, _)| id)
            .collect();
        if !declared.is_empty() {
            siblings
                .entry(normalize_slug(&doc.file_name))
                .or_default()
                .extend(declared);
        }
    }

    let mut mappings = Vec::new();
    let mut seen: HashSet<(String, RecordId)> = HashSet::new();
    let docs = brainstorms
        .iter()
        .map(|doc| (doc, DocKind::Brainstorm))
        .chain(plans.iter().map(|doc| (doc, DocKind::Plan)));
    for (doc, kind) in docs {
        let mut ids = extract_ids(&doc.text, infer);
        if ids.is_empty() {
            if let Some(borrowed) = siblings.get(&normalize_slug(&doc.file_name)) {
                ids = borrowed
                    .iter()
                    .map(|id| (id.clone(), MappingMode::InferredSibling))
                    .collect();
            }
        }
        for (bead_id, mode) in ids {
            if !seen.insert((doc.rel.clone(), bead_id.clone())) {
                continue;
            }
            mappings.push(Mapping {
                doc_path: doc.rel.clone(),
                doc_kind: kind,
                bead_id,
                mode,
            });
        }
    }
    Ok(mappings)
}

/// Writes the audit CSV, creating parent directories.
pub fn write_report_csv(path: &Path, mappings: &[Mapping]) -> csv::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(REPORT_HEADER)?;
    for mapping in mappings {
        writer.serialize(mapping)?;
    }
    writer.flush()?;
    Ok(())
}

fn load_docs(root: &Path, dir: &str) -> Result<Vec<Doc>, DocReadError> {
    let dir = root.join(dir);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| walk_entry(entry, "docmap"))
        .filter(is_file_entry)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".md"))
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let text = read_doc(&path)?;
            Ok(Doc {
                rel: relative_slash_path(root, &path),
                file_name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                text,
            })
        })
        .collect()
}

fn read_doc(path: &Path) -> Result<String, DocReadError> {
    read_text_lossy(path).map_err(|source| DocReadError {
        path: path.to_path_buf(),
        source,
    })
}
