//! Commit-manifest CSV input and the placeholders built from it.

use crate::model::label::{PLACEHOLDER_LABEL, RECOVERED_LABEL};
use crate::model::record::{cap_title_with_ellipsis, NewRecord};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Columns every manifest must declare in its header.
pub const REQUIRED_COLUMNS: [&str; 5] = ["id", "repo", "commit", "date", "subject"];

pub type ManifestResult<T> = Result<T, ManifestError>;

/// Manifest could not be read; always an input error.
#[derive(Debug)]
pub enum ManifestError {
    NotFound(PathBuf),
    MissingColumns(Vec<String>),
    Csv { path: PathBuf, source: csv::Error },
}

impl Display for ManifestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "CSV not found: {}", path.display()),
            Self::MissingColumns(columns) => {
                write!(f, "CSV missing columns: {}", columns.join(", "))
            }
            Self::Csv { path, source } => {
                write!(f, "failed to read CSV `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ManifestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Csv { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// One manifest row; absent cells decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ManifestRow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub subject: String,
}

/// Reads every row of the manifest at `path`.
///
/// Cells are trimmed. Extra columns are ignored; short rows are padded with
/// empty cells.
///
/// # Errors
/// - `NotFound` when `path` does not exist.
/// - `MissingColumns` (sorted) when the header lacks a required column.
/// - `Csv` for unreadable or undecodable content.
pub fn read_manifest(path: &Path) -> ManifestResult<Vec<ManifestRow>> {
    if !path.exists() {
        return Err(ManifestError::NotFound(path.to_path_buf()));
    }
    let csv_err = |source| ManifestError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?.clone();
    let present: BTreeSet<&str> = headers.iter().collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !present.contains(*column))
        .map(|column| (*column).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !missing.is_empty() {
        return Err(ManifestError::MissingColumns(missing));
    }

    reader
        .deserialize::<ManifestRow>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_err)
}

/// `[recovered] {subject}`, capped with an ellipsis.
pub fn placeholder_title(row: &ManifestRow) -> String {
    let subject = if row.subject.is_empty() {
        format!("Recovered placeholder for {}", row.id)
    } else {
        row.subject.clone()
    };
    cap_title_with_ellipsis(&format!("[recovered] {subject}"))
}

pub fn placeholder_description(manifest_path: &Path, row: &ManifestRow) -> String {
    format!(
        "Recovered placeholder bead created from git commit metadata after Beads data loss.\n\n\
         - Manifest source: {}\n\
         - Repository: {}\n\
         - Commit: {}\n\
         - Commit date: {}\n\
         - Commit subject: {}\n\n\
         Original bead payload (status history, dependencies, description, labels, notes) \
         was not recoverable from available Beads snapshots/backups.",
        manifest_path.display(),
        row.repo,
        row.commit,
        row.date,
        row.subject
    )
}

/// Full creation payload for one manifest row.
pub fn placeholder_record(manifest_path: &Path, row: &ManifestRow) -> NewRecord {
    let record = NewRecord::task(
        &row.id,
        placeholder_title(row),
        placeholder_description(manifest_path, row),
        &[RECOVERED_LABEL, PLACEHOLDER_LABEL],
    );
    if row.commit.is_empty() {
        record
    } else {
        record.with_external_ref(format!("git:{}", row.commit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_manifest(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("manifest.csv");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn reads_rows_and_trims_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            "id,repo,commit,date,subject,extra\n iv-ab12 ,core,abc123,2026-02-25, Fix crawler timeout ,x\n",
        );
        let rows = read_manifest(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "iv-ab12");
        assert_eq!(rows[0].subject, "Fix crawler timeout");
    }

    #[test]
    fn missing_columns_are_reported_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(dir.path(), "id,subject,repo\niv-1,x,y\n");
        match read_manifest(&path) {
            Err(ManifestError::MissingColumns(columns)) => {
                assert_eq!(columns, vec!["commit".to_string(), "date".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_manifest(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
        assert!(err.to_string().starts_with("CSV not found"));
    }

    #[test]
    fn title_falls_back_and_caps_length() {
        let row = ManifestRow {
            id: "iv-9".to_string(),
            ..ManifestRow::default()
        };
        assert_eq!(
            placeholder_title(&row),
            "[recovered] Recovered placeholder for iv-9"
        );

        let long = ManifestRow {
            subject: "x".repeat(400),
            ..row
        };
        let title = placeholder_title(&long);
        assert_eq!(title.chars().count(), 220);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn record_carries_commit_reference_only_when_present() {
        let path = Path::new("/tmp/m.csv");
        let mut row = ManifestRow {
            id: "IV-AB12".to_string(),
            commit: "abc123".to_string(),
            subject: "Fix crawler timeout".to_string(),
            ..ManifestRow::default()
        };
        let record = placeholder_record(path, &row);
        assert_eq!(record.id, "iv-ab12");
        assert_eq!(record.external_ref.as_deref(), Some("git:abc123"));
        assert_eq!(record.labels_csv(), "recovered,placeholder");
        assert!(record.description.contains("- Commit: abc123"));

        row.commit.clear();
        assert_eq!(placeholder_record(path, &row).external_ref, None);
    }
}
