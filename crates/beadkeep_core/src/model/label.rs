//! Label values and (record, label) attachments.
//!
//! # Invariants
//! - Classification labels carry a `mod:` or `theme:` namespace prefix.
//! - A `LabelPair` is unique per (record_id, label); ordering is by record
//!   then label so batches are deterministic.

use std::collections::{BTreeMap, BTreeSet};

/// Prefix for module (subproject) labels.
pub const MODULE_PREFIX: &str = "mod:";
/// Prefix for theme (kind of work) labels.
pub const THEME_PREFIX: &str = "theme:";

/// Label marking synthesized placeholder records.
pub const RECOVERED_LABEL: &str = "recovered";
/// Label marking records created without original payload.
pub const PLACEHOLDER_LABEL: &str = "placeholder";

/// Existing labels per record id.
pub type LabelSnapshot = BTreeMap<String, BTreeSet<String>>;

/// Classification dimension of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelNamespace {
    Module,
    Theme,
}

impl LabelNamespace {
    /// Detects the namespace from the label prefix.
    pub fn of(label: &str) -> Option<Self> {
        if label.starts_with(MODULE_PREFIX) {
            Some(Self::Module)
        } else if label.starts_with(THEME_PREFIX) {
            Some(Self::Theme)
        } else {
            None
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Module => MODULE_PREFIX,
            Self::Theme => THEME_PREFIX,
        }
    }
}

/// One label attached to one record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelPair {
    pub record_id: String,
    pub label: String,
}

impl LabelPair {
    pub fn new(record_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            label: label.into(),
        }
    }
}

/// Counts per label, split by namespace, sorted by count descending then name.
pub fn distribution(pairs: &[LabelPair], namespace: LabelNamespace) -> Vec<(String, usize)> {
    let mut counts = BTreeMap::<&str, usize>::new();
    for pair in pairs {
        if LabelNamespace::of(&pair.label) == Some(namespace) {
            *counts.entry(pair.label.as_str()).or_default() += 1;
        }
    }
    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    sorted.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
    sorted
}
