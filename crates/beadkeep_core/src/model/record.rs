//! Tracker record shapes and identifier helpers.
//!
//! # Responsibility
//! - Decode tracker rows into typed `Record` values.
//! - Describe record creation payloads (`NewRecord`) independent of adapter.
//! - Recognize canonical `iv-*` cross-reference identifiers in free text.
//!
//! # Invariants
//! - `find_ids` / `first_id` always return lowercase identifiers.
//! - Missing title/description fields decode to empty strings.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Identifier alias for tracker records.
pub type RecordId = String;

/// Default issue type for synthesized records.
pub const DEFAULT_ISSUE_TYPE: &str = "task";
/// Default priority for synthesized records.
pub const DEFAULT_PRIORITY: u8 = 2;
/// Maximum title length accepted for synthesized records.
pub const MAX_TITLE_CHARS: usize = 220;

static ID_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"iv-[a-z0-9]+(?:\.[0-9]+)*")
        .case_insensitive(true)
        .build()
        .expect("valid record id regex")
});

/// Lifecycle status as reported by the tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Open,
    InProgress,
    Blocked,
    Closed,
    /// Any status string this crate does not model.
    #[serde(other)]
    Unknown,
}

/// One tracker record, as read by the batch jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub status: RecordStatus,
}

impl Record {
    /// Title and description joined for keyword matching.
    pub fn classification_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// Creation payload passed to `Tracker::create_record`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub id: RecordId,
    pub issue_type: String,
    pub priority: u8,
    pub title: String,
    pub description: String,
    pub labels: Vec<String>,
    /// Provenance pointer, e.g. `git:<sha>`.
    pub external_ref: Option<String>,
}

impl NewRecord {
    /// Builds a task-typed record with default priority.
    ///
    /// The identifier is normalized to lowercase.
    pub fn task(
        id: &str,
        title: impl Into<String>,
        description: impl Into<String>,
        labels: &[&str],
    ) -> Self {
        Self {
            id: normalize_id(id),
            issue_type: DEFAULT_ISSUE_TYPE.to_string(),
            priority: DEFAULT_PRIORITY,
            title: title.into(),
            description: description.into(),
            labels: labels.iter().map(|label| (*label).to_string()).collect(),
            external_ref: None,
        }
    }

    /// Sets the external provenance reference.
    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }

    /// Labels joined the way the tracker CLI expects them.
    pub fn labels_csv(&self) -> String {
        self.labels.join(",")
    }
}

/// Lowercases and trims one identifier.
pub fn normalize_id(id: &str) -> RecordId {
    id.trim().to_lowercase()
}

/// All identifiers in `text`, lowercased, in order of appearance.
pub fn find_ids(text: &str) -> Vec<RecordId> {
    ID_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// First identifier in `text`, lowercased.
pub fn first_id(text: &str) -> Option<RecordId> {
    ID_RE.find(text).map(|m| m.as_str().to_lowercase())
}

/// Caps a title at `MAX_TITLE_CHARS`, marking the cut with `...`.
pub fn cap_title_with_ellipsis(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let mut capped: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
    capped.push_str("...");
    capped
}

/// Caps a title at `MAX_TITLE_CHARS` without a marker.
pub fn cap_title(title: &str) -> String {
    title.chars().take(MAX_TITLE_CHARS).collect()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn find_ids_lowercases_and_keeps_dotted_suffixes() {
        let ids = find_ids("see IV-AB12 and iv-cd34.2, not xiv");
        assert_eq!(ids, vec!["iv-ab12".to_string(), "iv-cd34.2".to_string()]);
        assert_eq!(first_id("nothing here"), None);
    }

    #[test]
    fn classification_text_joins_title_and_description() {
        let record = Record {
            id: "iv-1".to_string(),
            title: "[clavain] sync".to_string(),
            description: "loop".to_string(),
            status: RecordStatus::Open,
        };
        assert_eq!(record.classification_text(), "[clavain] sync loop");
    }

    #[test]
    fn record_decodes_null_text_and_unknown_status() {
        let record: Record = serde_json::from_value(json!({
            "id": "iv-1",
            "title": null,
            "status": "deferred"
        }))
        .unwrap();
        assert_eq!(record.title, "");
        assert_eq!(record.description, "");
        assert_eq!(record.status, RecordStatus::Unknown);
    }

    #[test]
    fn title_caps_respect_char_boundaries() {
        let long = "é".repeat(300);
        let with_marker = cap_title_with_ellipsis(&long);
        assert_eq!(with_marker.chars().count(), MAX_TITLE_CHARS);
        assert!(with_marker.ends_with("..."));
        assert_eq!(cap_title(&long).chars().count(), MAX_TITLE_CHARS);
        assert_eq!(cap_title_with_ellipsis("short"), "short");
    }

    #[test]
    fn new_record_normalizes_id() {
        let record = NewRecord::task("IV-XY9", "t", "d", &["recovered", "placeholder"]);
        assert_eq!(record.id, "iv-xy9");
        assert_eq!(record.labels_csv(), "recovered,placeholder");
        assert_eq!(record.priority, DEFAULT_PRIORITY);
    }
}
