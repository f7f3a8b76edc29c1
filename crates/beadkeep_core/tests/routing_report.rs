use beadkeep_core::metrics::{run_routing_report, MetricsError, RoutingReportRequest};
use beadkeep_core::OutputFormat;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 24).unwrap()
}

fn seed_metrics_db(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE agent_runs (
            session_id TEXT NOT NULL,
            agent_name TEXT,
            subagent_type TEXT,
            model TEXT,
            input_tokens INTEGER,
            output_tokens INTEGER,
            cache_read_tokens INTEGER,
            total_tokens INTEGER,
            wall_clock_ms INTEGER,
            timestamp TEXT
        );",
    )
    .unwrap();
    let runs = [
        ("session-one-aaaa", "interflux:review:fd-people", "claude-opus-4-6", 1_000_000, "2026-02-23T10:00:00"),
        ("session-one-aaaa", "interflux:review:fd-architecture", "claude-sonnet-4-6", 200_000, "2026-02-23T10:05:00"),
        ("session-two-bbbb", "interflux:review:fd-quality", "claude-opus-4-6", 500_000, "2026-02-24T09:00:00"),
        ("session-two-bbbb", "general-purpose", "claude-opus-4-6", 900_000, "2026-02-24T09:30:00"),
    ];
    for (session, agent, model, tokens, timestamp) in runs {
        conn.execute(
            "INSERT INTO agent_runs (
                session_id, agent_name, model, input_tokens, output_tokens,
                cache_read_tokens, total_tokens, wall_clock_ms, timestamp
             ) VALUES (?1, ?2, ?3, ?4, 0, 0, ?4, 1000, ?5);",
            params![session, agent, model, tokens, timestamp],
        )
        .unwrap();
    }
}

fn request(db: PathBuf) -> RoutingReportRequest {
    RoutingReportRequest {
        db,
        shadow_dir: None,
        session_filter: None,
        format: OutputFormat::Plain,
    }
}

#[test]
fn report_covers_review_sessions_only() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("metrics.db");
    seed_metrics_db(&db);

    let report = run_routing_report(&request(db), today()).unwrap();
    assert!(report.contains("=== Session Summary ==="));
    assert!(report.contains("session-one-..."));
    assert!(report.contains("session-two-..."));
    assert!(report.contains("fd-architecture"));
    assert!(!report.contains("general-purpose"));
    assert!(report.contains("=== Recommendations ==="));
}

#[test]
fn session_filter_limits_to_timestamp_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("metrics.db");
    seed_metrics_db(&db);

    let mut request = request(db);
    request.session_filter = Some("2026-02-24".to_string());
    request.format = OutputFormat::Markdown;
    let report = run_routing_report(&request, today()).unwrap();
    assert!(report.contains("**Sessions analyzed:** 1"));
    assert!(report.contains("fd-quality"));
    assert!(!report.contains("fd-people"));
}

#[test]
fn shadow_logs_add_divergence_section() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("metrics.db");
    seed_metrics_db(&db);
    let shadow_dir = dir.path().join("shadow");
    fs::create_dir_all(&shadow_dir).unwrap();
    fs::write(
        shadow_dir.join("routing-shadow-intercore.log"),
        "[B2-shadow] complexity=C1 would change model: sonnet → haiku\n",
    )
    .unwrap();

    let mut request = request(db);
    request.shadow_dir = Some(shadow_dir);
    let report = run_routing_report(&request, today()).unwrap();
    assert!(report.contains("=== Shadow Data ==="));
    assert!(report.contains("intercore"));
}

#[test]
fn missing_db_and_empty_results_are_distinct_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = run_routing_report(&request(dir.path().join("absent.db")), today()).unwrap_err();
    assert!(matches!(missing, MetricsError::DbNotFound(_)));
    assert!(missing.is_input_error());

    let db = dir.path().join("metrics.db");
    seed_metrics_db(&db);
    let mut request = request(db);
    request.session_filter = Some("2025".to_string());
    let empty = run_routing_report(&request, today()).unwrap_err();
    assert!(matches!(empty, MetricsError::NoData));
    assert!(!empty.is_input_error());
}
