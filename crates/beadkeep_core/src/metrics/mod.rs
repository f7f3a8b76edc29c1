//! Agent-run cost analysis for review routing experiments.
//!
//! # Responsibility
//! - Read review agent runs from an external metrics database.
//! - Price each run at its actual model tier and at the tier the agent's
//!   role would be routed to, then aggregate per session and per agent.
//! - Summarize shadow-routing divergence logs.
//!
//! # Invariants
//! - The metrics database is opened read-only.
//! - Unknown model ids price at zero; unknown agents keep their actual tier.

pub mod analysis;
pub mod pricing;
pub mod routing_report;
pub mod runs;
pub mod shadow;

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub use analysis::{analyze_session, analyze_sessions, AgentCost, SessionAnalysis};
pub use pricing::{agent_role, estimate_cost, normalize_agent_name, tier_rank, ModelTier};
pub use routing_report::{
    default_db_path, generate_report, local_today, run_routing_report, write_report,
    RoutingReportRequest,
};
pub use runs::{load_agent_runs, query_agent_runs, AgentRun};
pub use shadow::{parse_shadow_logs, ShadowEntry};

pub type MetricsResult<T> = Result<T, MetricsError>;

/// Failure while building the routing report.
#[derive(Debug)]
pub enum MetricsError {
    /// The metrics database file does not exist.
    DbNotFound(PathBuf),
    Db(DbError),
    /// The query matched no review runs.
    NoData,
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl MetricsError {
    /// Whether the failure is due to missing input.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::DbNotFound(_))
    }
}

impl Display for MetricsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DbNotFound(path) => {
                write!(f, "interstat database not found at {}", path.display())
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::NoData => write!(f, "No flux-drive review data found in interstat."),
            Self::Io { path, source } => {
                write!(f, "failed to write `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for MetricsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DbError> for MetricsError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for MetricsError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
