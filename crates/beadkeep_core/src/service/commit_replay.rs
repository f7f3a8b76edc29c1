//! Placeholder replay from a commit manifest.

use crate::recovery::manifest::{placeholder_record, read_manifest};
use crate::recovery::{Evidence, PlaceholderResolver, Resolution};
use crate::service::{LineSink, ServiceResult, Transcript};
use crate::tracker::Tracker;
use log::{info, warn};
use std::fmt::{Display, Formatter};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReplayReport {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub transcript: Transcript,
}

impl Display for CommitReplayReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "summary: created={} skipped={} failed={} dry_run={}",
            self.created, self.skipped, self.failed, self.dry_run
        )
    }
}

pub struct CommitReplayService<T: Tracker> {
    tracker: T,
    progress: Option<LineSink>,
}

impl<T: Tracker> CommitReplayService<T> {
    pub fn new(tracker: T) -> Self {
        Self {
            tracker,
            progress: None,
        }
    }

    /// Forwards progress lines to `sink` while the run is in flight.
    pub fn with_progress(mut self, sink: LineSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn into_inner(self) -> T {
        self.tracker
    }

    /// Creates a placeholder for every manifest row whose id is missing.
    ///
    /// # Errors
    /// - The manifest is missing or lacks required columns; nothing is
    ///   attempted in that case.
    pub fn run(&mut self, manifest_path: &Path, dry_run: bool) -> ServiceResult<CommitReplayReport> {
        let rows = read_manifest(manifest_path)?;
        let mut report = CommitReplayReport {
            transcript: Transcript::with_sink(self.progress.clone()),
            dry_run,
            ..CommitReplayReport::default()
        };
        let mut resolver = PlaceholderResolver::new(true);

        for row in rows.iter().filter(|row| !row.id.is_empty()) {
            let resolution = match resolver.resolve(&self.tracker, &row.id, Evidence::Structured) {
                Ok(resolution) => resolution,
                Err(err) => {
                    report.failed += 1;
                    report.transcript.err(format!("fail  {} :: {err}", row.id));
                    continue;
                }
            };
            let permit = match resolution {
                Resolution::Create(permit) => permit,
                other => {
                    report.skipped += 1;
                    report
                        .transcript
                        .out(format!("skip  {} ({})", row.id, other.reason()));
                    continue;
                }
            };

            let record = placeholder_record(manifest_path, row);
            match resolver.create(&mut self.tracker, permit, record, dry_run) {
                Ok(id) if dry_run => {
                    report.created += 1;
                    report.transcript.out(format!("would create {id}"));
                }
                Ok(id) => {
                    report.created += 1;
                    report.transcript.out(format!("create {id}"));
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        "event=commit_replay module=service status=error record_id={} error={}",
                        row.id, err
                    );
                    report.transcript.err(format!("fail  {} :: {err}", row.id));
                }
            }
        }

        info!(
            "event=commit_replay module=service status=ok created={} skipped={} failed={} dry_run={}",
            report.created, report.skipped, report.failed, report.dry_run
        );
        Ok(report)
    }
}
