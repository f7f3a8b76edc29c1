//! Module/theme label backfill.
//!
//! # Responsibility
//! - Classify every selected record and attach the missing `mod:`/`theme:`
//!   labels through the reconciler.
//!
//! # Invariants
//! - Records and existing labels are each fetched in one query.
//! - A second run over unchanged records adds nothing.

use crate::classify::classify_record;
use crate::model::label::{distribution, LabelNamespace, LabelPair};
use crate::reconcile::{
    apply_delta, compute_delta, desired_by_record, ApplyOptions, DEFAULT_BATCH_SIZE,
};
use crate::service::{LineSink, ServiceResult, Transcript};
use crate::tracker::{fetch_label_snapshot, fetch_records, StatusFilter, Tracker};
use log::{info, warn};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelBackfillRequest {
    pub status: StatusFilter,
    /// `0` means every record.
    pub limit: u32,
    pub batch_size: usize,
    pub dry_run: bool,
}

impl Default for LabelBackfillRequest {
    fn default() -> Self {
        Self {
            status: StatusFilter::All,
            limit: 0,
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelBackfillReport {
    pub checked: usize,
    /// Records that received at least one new label.
    pub labeled: usize,
    pub labels_added: usize,
    pub skipped: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub module_distribution: Vec<(String, usize)>,
    pub theme_distribution: Vec<(String, usize)>,
    pub transcript: Transcript,
}

impl Display for LabelBackfillReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "--- Summary ---")?;
        writeln!(f, "Checked:       {}", self.checked)?;
        writeln!(f, "Beads labeled: {}", self.labeled)?;
        writeln!(f, "Labels added:  {}", self.labels_added)?;
        writeln!(f, "Skipped:       {}", self.skipped)?;
        writeln!(f, "Failed:        {}", self.failed)?;
        write!(f, "Dry run:       {}", self.dry_run)?;
        for (heading, counts) in [
            ("Module distribution:", &self.module_distribution),
            ("Theme distribution:", &self.theme_distribution),
        ] {
            if counts.is_empty() {
                continue;
            }
            write!(f, "\n\n{heading}")?;
            for (label, count) in counts {
                write!(f, "\n  {label}: {count}")?;
            }
        }
        Ok(())
    }
}

pub struct LabelBackfillService<T: Tracker> {
    tracker: T,
    progress: Option<LineSink>,
}

impl<T: Tracker> LabelBackfillService<T> {
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

    /// Classifies records and applies the missing labels.
    ///
    /// # Errors
    /// - The records query fails. A failed label snapshot is logged and
    ///   treated as empty; insert-ignore keeps the result correct.
    pub fn run(&mut self, request: LabelBackfillRequest) -> ServiceResult<LabelBackfillReport> {
        let mut report = LabelBackfillReport {
            transcript: Transcript::with_sink(self.progress.clone()),
            dry_run: request.dry_run,
            ..LabelBackfillReport::default()
        };

        let records = fetch_records(&self.tracker, request.status, request.limit)?;
        report
            .transcript
            .out(format!("Processing {} beads...", records.len()));

        let snapshot = match fetch_label_snapshot(&self.tracker) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(
                    "event=label_snapshot module=service status=error error={}",
                    err
                );
                Default::default()
            }
        };
        report.transcript.out(format!(
            "Loaded {} existing labels across {} beads",
            snapshot.values().map(BTreeSet::len).sum::<usize>(),
            snapshot.len()
        ));

        let verb = if request.dry_run { "would_add" } else { "add" };
        let mut delta: Vec<LabelPair> = Vec::new();
        for record in &records {
            report.checked += 1;
            let desired = desired_by_record(
                classify_record(record)
                    .into_iter()
                    .map(|label| LabelPair::new(record.id.as_str(), label)),
            );
            let pairs = compute_delta(&desired, &snapshot);
            if pairs.is_empty() {
                report.skipped += 1;
                continue;
            }
            report.labeled += 1;
            for pair in &pairs {
                report
                    .transcript
                    .out(format!("  {verb} {} <- {}", pair.record_id, pair.label));
            }
            delta.extend(pairs);
        }

        report.module_distribution = distribution(&delta, LabelNamespace::Module);
        report.theme_distribution = distribution(&delta, LabelNamespace::Theme);

        let outcome = apply_delta(
            &mut self.tracker,
            &delta,
            ApplyOptions {
                batch_size: request.batch_size,
                dry_run: request.dry_run,
            },
        );
        report.labels_added = outcome.applied;
        report.failed = outcome.failed;

        info!(
            "event=label_backfill module=service status=ok checked={} labeled={} labels_added={} failed={} dry_run={}",
            report.checked, report.labeled, report.labels_added, report.failed, report.dry_run
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::NewRecord;
    use crate::tracker::SqliteTracker;

    fn seeded() -> SqliteTracker {
        let mut tracker = SqliteTracker::open_in_memory().unwrap();
        tracker
            .create_record(&NewRecord::task(
                "iv-a1",
                "[interflux] improve cache token efficiency",
                "",
                &[],
            ))
            .unwrap();
        tracker
            .create_record(&NewRecord::task("iv-a2", "misc chores", "", &[]))
            .unwrap();
        tracker
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let mut service = LabelBackfillService::new(seeded());
        let report = service
            .run(LabelBackfillRequest {
                dry_run: true,
                ..LabelBackfillRequest::default()
            })
            .unwrap();

        assert_eq!(report.checked, 2);
        assert_eq!(report.labeled, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.labels_added, 2);
        assert!(report
            .transcript
            .lines()
            .iter()
            .any(|(_, line)| line == "  would_add iv-a1 <- mod:interflux"));
        let tracker = service.into_inner();
        assert!(tracker.labels_for("iv-a1").unwrap().is_empty());
    }

    #[test]
    fn summary_lists_distributions() {
        let mut service = LabelBackfillService::new(seeded());
        let report = service.run(LabelBackfillRequest::default()).unwrap();
        let text = report.to_string();
        assert!(text.contains("Labels added:  2"));
        assert!(text.contains("Module distribution:\n  mod:interflux: 1"));
        assert!(text.contains("Theme distribution:\n  theme:performance: 1"));
        assert!(text.contains("Dry run:       false"));
    }
}
