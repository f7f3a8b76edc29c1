//! Rule-table text classification.
//!
//! # Responsibility
//! - Turn free text into a set of namespaced labels.
//! - Keep evaluation pure: no I/O, no state between calls.
//!
//! # Invariants
//! - Keyword tables are evaluated exhaustively; several labels of the same
//!   dimension may match one text.
//! - Bracket tables resolve each bracket token independently and honour
//!   explicit "no label" entries.
//! - No match yields an empty set, never an error.

pub mod rules;
pub mod taxonomy;

pub use rules::{BracketTable, Rule, RuleTable};
pub use taxonomy::{classify_record, detect_modules, detect_themes};
