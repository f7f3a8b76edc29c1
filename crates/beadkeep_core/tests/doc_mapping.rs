use beadkeep_core::docmap::collect_mappings;
use beadkeep_core::service::{DocMappingRequest, DocMappingService};
use beadkeep_core::{MappingMode, NewRecord, SqliteTracker, Tracker};
use std::fs;
use std::path::Path;

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn request(root: &Path) -> DocMappingRequest {
    DocMappingRequest::new(root, root.join("out").join("map.csv"))
}

#[test]
fn plan_borrows_declared_id_from_sibling_brainstorm() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "docs/brainstorms/2026-01-05-crawler-brainstorm.md",
        "# Crawler\n\n**Bead:** iv-cd34\n",
    );
    write(root, "docs/plans/2026-01-07-crawler.md", "# Crawler plan\nNo ids here.\n");

    let mappings = collect_mappings(root, true).unwrap();
    let plan = mappings
        .iter()
        .find(|m| m.doc_path == "docs/plans/2026-01-07-crawler.md")
        .unwrap();
    assert_eq!(plan.bead_id, "iv-cd34");
    assert_eq!(plan.mode, MappingMode::InferredSibling);
}

#[test]
fn prds_feed_sibling_index_but_are_not_mapped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "docs/prds/2026-01-01-sync.md", "**Bead:** iv-s2 iv-s1\n");
    write(root, "docs/plans/2026-01-02-sync.md", "plan body\n");

    let mappings = collect_mappings(root, false).unwrap();
    let ids: Vec<(&str, MappingMode)> = mappings
        .iter()
        .map(|m| (m.bead_id.as_str(), m.mode))
        .collect();
    assert_eq!(
        ids,
        vec![
            ("iv-s1", MappingMode::InferredSibling),
            ("iv-s2", MappingMode::InferredSibling),
        ]
    );
}

#[test]
fn mapping_appends_note_once() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "docs/plans/cache.md", "**Bead:** iv-c1\n");

    let mut tracker = SqliteTracker::open_in_memory().unwrap();
    tracker
        .create_record(&NewRecord::task("iv-c1", "Cache", "", &[]))
        .unwrap();

    let first = DocMappingService::new(&mut tracker)
        .run(&request(root))
        .unwrap();
    assert_eq!((first.mapped, first.skipped, first.errors), (1, 0, 0));
    assert_eq!(
        tracker.notes_for("iv-c1").unwrap().as_deref(),
        Some("[doc-map] plan (declared): docs/plans/cache.md")
    );

    let second = DocMappingService::new(&mut tracker)
        .run(&request(root))
        .unwrap();
    assert_eq!((second.mapped, second.skipped), (0, 1));

    let csv = fs::read_to_string(root.join("out").join("map.csv")).unwrap();
    assert_eq!(
        csv,
        "doc_path,doc_kind,bead_id,mode\ndocs/plans/cache.md,plan,iv-c1,declared\n"
    );
}

#[test]
fn missing_declared_ids_get_doc_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "docs/brainstorms/queue.md", "# Queue redesign\n**Bead:** iv-q1\n");

    let mut tracker = SqliteTracker::open_in_memory().unwrap();
    let report = DocMappingService::new(&mut tracker)
        .run(&request(root))
        .unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.missing_ids.len(), 1);

    let shown = tracker.show("iv-q1").unwrap().unwrap();
    assert!(shown.starts_with("iv-q1: [recovered-doc] Queue redesign\n"));
    assert!(shown.contains("doc-map"));
}

#[test]
fn inferred_missing_ids_are_reported_not_created() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "docs/plans/misc.md", "mentions iv-m9 in passing\n");

    let mut tracker = SqliteTracker::open_in_memory().unwrap();
    let report = DocMappingService::new(&mut tracker)
        .run(&request(root))
        .unwrap();
    assert_eq!(report.unresolved_inferred, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.created, 0);
    assert!(!tracker.record_exists("iv-m9").unwrap());
}

#[test]
fn creation_disabled_counts_missing_as_errors() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "docs/plans/x.md", "**Bead:** iv-x1\n");

    let mut tracker = SqliteTracker::open_in_memory().unwrap();
    let mut request = request(root);
    request.create_missing = false;
    let report = DocMappingService::new(&mut tracker).run(&request).unwrap();
    assert_eq!(report.errors, 1);
    assert_eq!(tracker.record_count().unwrap(), 0);
    assert!(report.to_string().contains("errors=1 missing_ids_seen=1"));
}

#[test]
fn existing_template_id_record_still_gets_mapped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "docs/plans/x.md", "**Bead:** iv-xxxx\n");

    let mut tracker = SqliteTracker::open_in_memory().unwrap();
    tracker
        .create_record(&NewRecord::task("iv-xxxx", "Real record", "", &[]))
        .unwrap();

    let report = DocMappingService::new(&mut tracker)
        .run(&request(root))
        .unwrap();
    assert_eq!((report.mapped, report.skipped, report.created), (1, 0, 0));
    assert!(report.missing_ids.is_empty());
    assert_eq!(
        tracker.notes_for("iv-xxxx").unwrap().as_deref(),
        Some("[doc-map] plan (declared): docs/plans/x.md")
    );
}

#[test]
fn missing_template_id_is_skipped_not_created() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "docs/plans/x.md", "**Bead:** iv-bbbb\n");

    let mut tracker = SqliteTracker::open_in_memory().unwrap();
    let report = DocMappingService::new(&mut tracker)
        .run(&request(root))
        .unwrap();
    assert_eq!((report.created, report.skipped), (0, 1));
    assert_eq!(tracker.record_count().unwrap(), 0);
}
