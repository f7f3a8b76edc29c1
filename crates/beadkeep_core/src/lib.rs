//! Maintenance jobs for a beads issue tracker.
//!
//! Label classification and reconciliation, placeholder recovery after data
//! loss, doc → record mapping, AGENTS.md protocol backfill and routing cost
//! reports. Each job is a single read → compute → write pass.

pub mod classify;
pub mod db;
pub mod docmap;
mod fsutil;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod reconcile;
pub mod recovery;
pub mod report;
pub mod service;
pub mod tracker;

pub use classify::{classify_record, detect_modules, detect_themes};
pub use logging::{default_log_level, init_logging};
pub use model::label::{LabelPair, LabelSnapshot};
pub use model::mapping::{DocKind, Mapping, MappingMode};
pub use model::record::{NewRecord, Record, RecordStatus};
pub use reconcile::{apply_delta, compute_delta, ApplyOptions, ApplyOutcome};
pub use recovery::{Evidence, PlaceholderResolver, Resolution};
pub use report::OutputFormat;
pub use tracker::{BdCli, SqliteTracker, StatusFilter, Tracker, TrackerError, TrackerResult};
