//! Document-to-record association shapes.

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Confidence tier for a document → record association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MappingMode {
    /// Structured `**Bead:**` or plain `Bead:` declaration.
    #[serde(rename = "declared")]
    Declared,
    /// First identifier found anywhere in the body.
    #[serde(rename = "inferred")]
    Inferred,
    /// Borrowed from a sibling document sharing the same slug.
    #[serde(rename = "inferred-sibling")]
    InferredSibling,
}

impl MappingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Declared => "declared",
            Self::Inferred => "inferred",
            Self::InferredSibling => "inferred-sibling",
        }
    }
}

impl Display for MappingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which corpus directory a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocKind {
    Brainstorm,
    Plan,
}

impl DocKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brainstorm => "brainstorm",
            Self::Plan => "plan",
        }
    }
}

impl Display for DocKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolved association; serialized as an audit CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mapping {
    /// Path relative to the corpus root, `/`-separated.
    pub doc_path: String,
    pub doc_kind: DocKind,
    pub bead_id: String,
    pub mode: MappingMode,
}

impl Mapping {
    /// Note text appended to the mapped record.
    pub fn note_text(&self) -> String {
        format!(
            "[doc-map] {} ({}): {}",
            self.doc_kind, self.mode, self.doc_path
        )
    }
}
