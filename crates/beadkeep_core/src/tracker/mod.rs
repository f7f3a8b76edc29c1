//! Tracker capability boundary.
//!
//! # Responsibility
//! - Define the narrow set of primitives the batch jobs need from an issue
//!   tracker: query rows, show one record, create, label, append a note.
//! - Provide adapters for the `bd` command-line tool and for a local SQLite
//!   tracker database.
//!
//! # Invariants
//! - Every primitive reports failure through `TrackerResult`; adapters never
//!   exit the process or panic on a failed mutation.
//! - `show` returns `Ok(None)` for a record the tracker does not know.
//! - `add_labels_bulk` has insert-ignore semantics: pairs that already exist
//!   are not errors.

use crate::db::DbError;
use crate::model::label::LabelPair;
use crate::model::record::NewRecord;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod bd_cli;
pub mod queries;
pub mod sqlite;

pub use bd_cli::BdCli;
pub use queries::{fetch_label_snapshot, fetch_records, StatusFilter};
pub use sqlite::SqliteTracker;

/// One query result row keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Failure of one tracker primitive.
#[derive(Debug)]
pub enum TrackerError {
    /// The tracker program could not be started.
    Spawn {
        program: String,
        source: std::io::Error,
    },
    /// The tracker program exited unsuccessfully.
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    /// Output could not be decoded into the expected shape.
    InvalidOutput(String),
    Db(DbError),
    NotFound(String),
    AlreadyExists(String),
    MissingRequiredTable(&'static str),
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn { program, source } => write!(f, "failed to run `{program}`: {source}"),
            Self::CommandFailed {
                command,
                code,
                stderr,
            } => match code {
                Some(code) => write!(f, "`{command}` exited with {code}: {stderr}"),
                None => write!(f, "`{command}` terminated by signal: {stderr}"),
            },
            Self::InvalidOutput(message) => write!(f, "invalid tracker output: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::AlreadyExists(id) => write!(f, "record already exists: {id}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "tracker database is missing table `{table}`")
            }
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for TrackerError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidOutput(value.to_string())
    }
}

/// Primitives an issue tracker must offer to the batch jobs.
pub trait Tracker {
    /// Runs a read query and returns its rows.
    fn query(&self, sql: &str) -> TrackerResult<Vec<Row>>;
    /// Human-readable dump of one record, including accumulated notes.
    fn show(&self, id: &str) -> TrackerResult<Option<String>>;
    /// Whether the tracker knows `id`.
    fn record_exists(&self, id: &str) -> TrackerResult<bool> {
        Ok(self.show(id)?.is_some())
    }
    /// Creates one record with its initial labels.
    fn create_record(&mut self, record: &NewRecord) -> TrackerResult<()>;
    /// Attaches one label to one existing record.
    fn add_label(&mut self, id: &str, label: &str) -> TrackerResult<()>;
    /// Attaches many labels in one call, ignoring pairs that already exist.
    fn add_labels_bulk(&mut self, pairs: &[LabelPair]) -> TrackerResult<()>;
    /// Appends one line to the record's notes.
    fn append_note(&mut self, id: &str, note: &str) -> TrackerResult<()>;
}

impl<T: Tracker + ?Sized> Tracker for &mut T {
    fn query(&self, sql: &str) -> TrackerResult<Vec<Row>> {
        (**self).query(sql)
    }

    fn show(&self, id: &str) -> TrackerResult<Option<String>> {
        (**self).show(id)
    }

    fn record_exists(&self, id: &str) -> TrackerResult<bool> {
        (**self).record_exists(id)
    }

    fn create_record(&mut self, record: &NewRecord) -> TrackerResult<()> {
        (**self).create_record(record)
    }

    fn add_label(&mut self, id: &str, label: &str) -> TrackerResult<()> {
        (**self).add_label(id, label)
    }

    fn add_labels_bulk(&mut self, pairs: &[LabelPair]) -> TrackerResult<()> {
        (**self).add_labels_bulk(pairs)
    }

    fn append_note(&mut self, id: &str, note: &str) -> TrackerResult<()> {
        (**self).append_note(id, note)
    }
}

impl<T: Tracker + ?Sized> Tracker for Box<T> {
    fn query(&self, sql: &str) -> TrackerResult<Vec<Row>> {
        (**self).query(sql)
    }

    fn show(&self, id: &str) -> TrackerResult<Option<String>> {
        (**self).show(id)
    }

    fn record_exists(&self, id: &str) -> TrackerResult<bool> {
        (**self).record_exists(id)
    }

    fn create_record(&mut self, record: &NewRecord) -> TrackerResult<()> {
        (**self).create_record(record)
    }

    fn add_label(&mut self, id: &str, label: &str) -> TrackerResult<()> {
        (**self).add_label(id, label)
    }

    fn add_labels_bulk(&mut self, pairs: &[LabelPair]) -> TrackerResult<()> {
        (**self).add_labels_bulk(pairs)
    }

    fn append_note(&mut self, id: &str, note: &str) -> TrackerResult<()> {
        (**self).append_note(id, note)
    }
}
