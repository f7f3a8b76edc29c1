//! Batch maintenance jobs.
//!
//! # Responsibility
//! - Run one read → compute → write pass per job and return its counts.
//! - Keep per-item failures inside the report; only input errors and fatal
//!   tracker failures surface as `ServiceError`.
//!
//! # Invariants
//! - Every report renders a summary line including the dry-run flag.
//! - `failed > 0` in any report means the caller must exit non-zero.

pub mod commit_replay;
pub mod doc_mapping;
pub mod label_backfill;
pub mod protocol_backfill;
pub mod roadmap_replay;

use crate::docmap::DocReadError;
use crate::recovery::manifest::ManifestError;
use crate::tracker::TrackerError;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;
use std::rc::Rc;

pub use commit_replay::{CommitReplayReport, CommitReplayService};
pub use doc_mapping::{DocMappingReport, DocMappingRequest, DocMappingService};
pub use label_backfill::{LabelBackfillReport, LabelBackfillRequest, LabelBackfillService};
pub use protocol_backfill::{backfill_protocol, ProtocolBackfillReport, DEFAULT_TARGETS};
pub use roadmap_replay::{RoadmapReplayReport, RoadmapReplayService};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Fatal job failure.
#[derive(Debug)]
pub enum ServiceError {
    Tracker(TrackerError),
    Manifest(ManifestError),
    DocRead(DocReadError),
    Report { path: PathBuf, source: csv::Error },
}

impl ServiceError {
    /// Whether the failure is due to missing or malformed input.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Manifest(_))
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tracker(err) => write!(f, "{err}"),
            Self::Manifest(err) => write!(f, "{err}"),
            Self::DocRead(err) => write!(f, "{err}"),
            Self::Report { path, source } => {
                write!(f, "failed to write report `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Tracker(err) => Some(err),
            Self::Manifest(err) => Some(err),
            Self::DocRead(err) => Some(err),
            Self::Report { source, .. } => Some(source),
        }
    }
}

impl From<TrackerError> for ServiceError {
    fn from(value: TrackerError) -> Self {
        Self::Tracker(value)
    }
}

impl From<ManifestError> for ServiceError {
    fn from(value: ManifestError) -> Self {
        Self::Manifest(value)
    }
}

impl From<DocReadError> for ServiceError {
    fn from(value: DocReadError) -> Self {
        Self::DocRead(value)
    }
}

/// Destination of one progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Receives each progress line as soon as it is produced.
pub type LineSink = Rc<dyn Fn(Stream, &str)>;

/// Ordered per-item progress lines produced during a run.
///
/// With a sink attached, every line is forwarded the moment it is recorded,
/// so an interrupted run has already reported the items it touched.
#[derive(Clone, Default)]
pub struct Transcript {
    lines: Vec<(Stream, String)>,
    sink: Option<LineSink>,
}

impl Transcript {
    pub fn with_sink(sink: Option<LineSink>) -> Self {
        Self {
            lines: Vec::new(),
            sink,
        }
    }

    pub fn out(&mut self, line: impl Into<String>) {
        self.push(Stream::Stdout, line.into());
    }

    pub fn err(&mut self, line: impl Into<String>) {
        self.push(Stream::Stderr, line.into());
    }

    pub fn lines(&self) -> &[(Stream, String)] {
        &self.lines
    }

    fn push(&mut self, stream: Stream, line: String) {
        if let Some(sink) = &self.sink {
            sink(stream, &line);
        }
        self.lines.push((stream, line));
    }
}

impl Debug for Transcript {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript")
            .field("lines", &self.lines)
            .field("live", &self.sink.is_some())
            .finish()
    }
}

impl PartialEq for Transcript {
    fn eq(&self, other: &Self) -> bool {
        self.lines == other.lines
    }
}

impl Eq for Transcript {}
