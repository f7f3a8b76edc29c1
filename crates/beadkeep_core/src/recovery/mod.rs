//! Placeholder recovery after tracker data loss.
//!
//! # Responsibility
//! - Decide, per referenced identifier, whether a placeholder record must be
//!   synthesized (`placeholder`).
//! - Read the provenance sources placeholders are built from: commit
//!   manifests (`manifest`) and roadmap documents (`roadmap`).
//!
//! # Invariants
//! - Template identifiers are never passed to the creation primitive.
//! - An identifier created once in a run is treated as existing for the rest
//!   of that run.
//! - Low-confidence (inferred) references are reported, never created.

pub mod manifest;
pub mod placeholder;
pub mod roadmap;

pub use placeholder::{
    is_template_id, CreatePermit, Evidence, PlaceholderResolver, Resolution, TEMPLATE_IDS,
};
