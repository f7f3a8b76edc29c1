//! Review agent runs read from the metrics database.

use super::{MetricsError, MetricsResult};
use crate::db::open_read_only;
use log::info;
use rusqlite::{params_from_iter, Connection, Row};
use std::path::Path;

const AGENT_RUNS_SQL: &str = "SELECT
    session_id,
    COALESCE(subagent_type, agent_name) AS agent,
    model,
    input_tokens,
    output_tokens,
    cache_read_tokens,
    total_tokens,
    wall_clock_ms,
    timestamp
FROM agent_runs
WHERE (
    COALESCE(subagent_type, agent_name) LIKE '%interflux%'
    OR COALESCE(subagent_type, agent_name) LIKE '%fd-%'
    OR COALESCE(subagent_type, agent_name) LIKE '%intersynth%'
)
AND total_tokens IS NOT NULL";

/// One review agent invocation; null token counts read as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRun {
    pub session_id: String,
    pub agent: String,
    pub model: Option<String>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_read_tokens: i64,
    pub total_tokens: i64,
    pub wall_clock_ms: i64,
    pub timestamp: Option<String>,
}

impl AgentRun {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            session_id: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
            agent: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            model: row.get(2)?,
            input_tokens: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
            output_tokens: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            cache_read_tokens: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
            total_tokens: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
            wall_clock_ms: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
            timestamp: row.get(8)?,
        })
    }
}

/// Review runs ordered by session and time, optionally limited to
/// timestamps starting with `session_filter`.
pub fn query_agent_runs(
    conn: &Connection,
    session_filter: Option<&str>,
) -> MetricsResult<Vec<AgentRun>> {
    let mut sql = String::from(AGENT_RUNS_SQL);
    let mut params = Vec::new();
    if let Some(prefix) = session_filter {
        sql.push_str("\nAND timestamp LIKE ?1");
        params.push(format!("{prefix}%"));
    }
    sql.push_str("\nORDER BY session_id, timestamp");

    let mut stmt = conn.prepare(&sql)?;
    let runs = stmt
        .query_map(params_from_iter(params.iter()), AgentRun::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    info!(
        "event=agent_runs_query module=metrics status=ok rows={} filtered={}",
        runs.len(),
        session_filter.is_some()
    );
    Ok(runs)
}

/// Opens the metrics database at `path` read-only and queries it.
pub fn load_agent_runs(path: &Path, session_filter: Option<&str>) -> MetricsResult<Vec<AgentRun>> {
    if !path.is_file() {
        return Err(MetricsError::DbNotFound(path.to_path_buf()));
    }
    let conn = open_read_only(path)?;
    query_agent_runs(&conn, session_filter)
}
