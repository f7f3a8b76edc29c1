//! Placeholder replay for ids referenced by roadmap documents.

use crate::recovery::roadmap::{placeholder_record, scan_roadmaps};
use crate::recovery::{Evidence, PlaceholderResolver, Resolution};
use crate::service::{LineSink, ServiceResult, Transcript};
use crate::tracker::Tracker;
use log::{info, warn};
use std::fmt::{Display, Formatter};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoadmapReplayReport {
    /// Referenced ids absent from the tracker, template ids included.
    pub missing_detected: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub unreadable: Vec<String>,
    pub dry_run: bool,
    pub transcript: Transcript,
}

impl Display for RoadmapReplayReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "summary: missing_detected={} created={} skipped={} failed={} unreadable_files={} dry_run={}",
            self.missing_detected,
            self.created,
            self.skipped,
            self.failed,
            self.unreadable.len(),
            self.dry_run
        )?;
        if !self.unreadable.is_empty() {
            write!(f, "\nunreadable:")?;
            for path in &self.unreadable {
                write!(f, "\n{path}")?;
            }
        }
        Ok(())
    }
}

pub struct RoadmapReplayService<T: Tracker> {
    tracker: T,
    progress: Option<LineSink>,
}

impl<T: Tracker> RoadmapReplayService<T> {
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

    /// Scans roadmap files under `root` and creates missing placeholders,
    /// in id order.
    pub fn run(&mut self, root: &Path, dry_run: bool) -> ServiceResult<RoadmapReplayReport> {
        let scan = scan_roadmaps(root);
        let mut report = RoadmapReplayReport {
            transcript: Transcript::with_sink(self.progress.clone()),
            unreadable: scan.unreadable.clone(),
            dry_run,
            ..RoadmapReplayReport::default()
        };
        let mut resolver = PlaceholderResolver::new(true);

        for (id, sources) in &scan.sources {
            let resolution = match resolver.resolve(&self.tracker, id, Evidence::Structured) {
                Ok(resolution) => resolution,
                Err(err) => {
                    report.failed += 1;
                    report.transcript.err(format!("error {id}: {err}"));
                    continue;
                }
            };
            if resolution.is_missing() {
                report.missing_detected += 1;
            }
            let permit = match resolution {
                Resolution::Exists => continue,
                Resolution::Create(permit) => permit,
                Resolution::SkipTemplate => {
                    report.skipped += 1;
                    report.transcript.out(format!("skip_template {id}"));
                    continue;
                }
                other => {
                    report.skipped += 1;
                    report.transcript.out(format!("skip {id} ({})", other.reason()));
                    continue;
                }
            };

            match resolver.create(
                &mut self.tracker,
                permit,
                placeholder_record(id, sources),
                dry_run,
            ) {
                Ok(id) => {
                    report.created += 1;
                    let verb = if dry_run { "would_create" } else { "created" };
                    report.transcript.out(format!("{verb} {id}"));
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        "event=roadmap_replay module=service status=error record_id={} error={}",
                        id, err
                    );
                    report.transcript.err(format!("error {id}: {err}"));
                }
            }
        }

        info!(
            "event=roadmap_replay module=service status=ok missing_detected={} created={} failed={} unreadable_files={} dry_run={}",
            report.missing_detected,
            report.created,
            report.failed,
            report.unreadable.len(),
            report.dry_run
        );
        Ok(report)
    }
}
