use beadkeep_core::model::label::LabelPair;
use beadkeep_core::service::{LabelBackfillRequest, LabelBackfillService};
use beadkeep_core::tracker::Row;
use beadkeep_core::{
    apply_delta, ApplyOptions, NewRecord, SqliteTracker, Tracker, TrackerError, TrackerResult,
};
use std::collections::BTreeSet;

/// Delegates to a SQLite tracker but rejects every bulk call.
struct FailingBulk(SqliteTracker);

impl Tracker for FailingBulk {
    fn query(&self, sql: &str) -> TrackerResult<Vec<Row>> {
        self.0.query(sql)
    }

    fn show(&self, id: &str) -> TrackerResult<Option<String>> {
        self.0.show(id)
    }

    fn create_record(&mut self, record: &NewRecord) -> TrackerResult<()> {
        self.0.create_record(record)
    }

    fn add_label(&mut self, id: &str, label: &str) -> TrackerResult<()> {
        self.0.add_label(id, label)
    }

    fn add_labels_bulk(&mut self, _pairs: &[LabelPair]) -> TrackerResult<()> {
        Err(TrackerError::CommandFailed {
            command: "bd sql".to_string(),
            code: Some(1),
            stderr: "batch rejected".to_string(),
        })
    }

    fn append_note(&mut self, id: &str, note: &str) -> TrackerResult<()> {
        self.0.append_note(id, note)
    }
}

fn seeded() -> SqliteTracker {
    let mut tracker = SqliteTracker::open_in_memory().unwrap();
    for (id, title) in [
        ("iv-a1", "[interflux] improve cache token efficiency"),
        ("iv-a2", "[clavain] refactor sync loop"),
        ("iv-a3", "misc chores"),
        ("iv-a4", "dashboard telemetry"),
    ] {
        tracker
            .create_record(&NewRecord::task(id, title, "", &[]))
            .unwrap();
    }
    tracker
}

fn all_labels(tracker: &SqliteTracker) -> BTreeSet<(String, String)> {
    ["iv-a1", "iv-a2", "iv-a3", "iv-a4"]
        .iter()
        .flat_map(|id| {
            tracker
                .labels_for(id)
                .unwrap()
                .into_iter()
                .map(move |label| (id.to_string(), label))
        })
        .collect()
}

#[test]
fn backfill_attaches_module_and_theme_labels() {
    let mut service = LabelBackfillService::new(seeded());
    let report = service.run(LabelBackfillRequest::default()).unwrap();

    assert_eq!(report.checked, 4);
    assert_eq!(report.labeled, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.labels_added, 6);
    assert_eq!(report.failed, 0);

    let tracker = service.into_inner();
    assert_eq!(
        tracker.labels_for("iv-a1").unwrap(),
        BTreeSet::from(["mod:interflux".to_string(), "theme:performance".to_string()])
    );
    assert!(tracker.labels_for("iv-a3").unwrap().is_empty());
}

#[test]
fn second_run_is_a_no_op() {
    let mut service = LabelBackfillService::new(seeded());
    service.run(LabelBackfillRequest::default()).unwrap();
    let before = all_labels(&service.into_inner());

    let mut service = LabelBackfillService::new(seeded());
    service.run(LabelBackfillRequest::default()).unwrap();
    let second = service.run(LabelBackfillRequest::default()).unwrap();

    assert_eq!(second.labeled, 0);
    assert_eq!(second.labels_added, 0);
    assert_eq!(second.skipped, 4);
    assert_eq!(all_labels(&service.into_inner()), before);
}

#[test]
fn existing_labels_are_not_reapplied() {
    let mut tracker = seeded();
    tracker.add_label("iv-a1", "mod:interflux").unwrap();

    let mut service = LabelBackfillService::new(tracker);
    let report = service.run(LabelBackfillRequest::default()).unwrap();
    assert_eq!(report.labels_added, 5);
    assert!(!report
        .transcript
        .lines()
        .iter()
        .any(|(_, line)| line.contains("iv-a1 <- mod:interflux")));
}

#[test]
fn bulk_failure_degrades_to_identical_result() {
    let request = LabelBackfillRequest {
        batch_size: 2,
        ..LabelBackfillRequest::default()
    };

    let mut healthy = LabelBackfillService::new(seeded());
    let healthy_report = healthy.run(request).unwrap();

    let mut degraded = LabelBackfillService::new(FailingBulk(seeded()));
    let degraded_report = degraded.run(request).unwrap();

    assert_eq!(degraded_report.labels_added, healthy_report.labels_added);
    assert_eq!(degraded_report.failed, 0);
    assert_eq!(
        all_labels(&degraded.into_inner().0),
        all_labels(&healthy.into_inner())
    );
}

#[test]
fn one_bad_pair_does_not_block_its_batch() {
    let mut tracker = seeded();
    let delta = vec![
        LabelPair::new("iv-a1", "theme:ux"),
        LabelPair::new("iv-missing", "theme:ux"),
        LabelPair::new("iv-a2", "theme:ux"),
    ];

    let outcome = apply_delta(
        &mut tracker,
        &delta,
        ApplyOptions {
            batch_size: 50,
            dry_run: false,
        },
    );

    assert_eq!(outcome.batches, 1);
    assert_eq!(outcome.degraded_batches, 1);
    assert_eq!(outcome.applied, 2);
    assert_eq!(outcome.failed, 1);
    assert!(tracker.labels_for("iv-a2").unwrap().contains("theme:ux"));
}

#[test]
fn status_filter_and_limit_scope_the_run() {
    let mut tracker = seeded();
    tracker
        .connection()
        .execute("UPDATE issues SET status = 'closed' WHERE id = 'iv-a1';", [])
        .unwrap();

    let mut service = LabelBackfillService::new(tracker);
    let open = service
        .run(LabelBackfillRequest {
            status: beadkeep_core::StatusFilter::Open,
            dry_run: true,
            ..LabelBackfillRequest::default()
        })
        .unwrap();
    assert_eq!(open.checked, 3);

    let limited = service
        .run(LabelBackfillRequest {
            limit: 1,
            dry_run: true,
            ..LabelBackfillRequest::default()
        })
        .unwrap();
    assert_eq!(limited.checked, 1);
}
