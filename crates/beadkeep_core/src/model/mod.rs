//! Domain model shared by classification, reconciliation and recovery.
//!
//! # Responsibility
//! - Define the record/label/mapping shapes read from and written to the tracker.
//! - Own identifier normalization for cross-references.
//!
//! # Invariants
//! - Canonical identifiers are lowercased before comparison or creation.
//! - Label attachments are additive; nothing in this crate removes one.

pub mod label;
pub mod mapping;
pub mod record;
