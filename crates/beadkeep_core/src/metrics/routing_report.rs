//! Routing experiment report rendering.

use super::analysis::{analyze_sessions, SessionAnalysis};
use super::pricing::{agent_role, tier_rank, ModelTier};
use super::runs::load_agent_runs;
use super::shadow::{parse_shadow_logs, ShadowEntry};
use super::{MetricsError, MetricsResult};
use crate::report::{format_table, group_thousands, OutputFormat};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Savings above this percentage recommend enforcing routing.
const ENFORCE_THRESHOLD_PCT: f64 = 5.0;
const SESSION_ID_CHARS: usize = 12;
const CHECKER_ROLE: &str = "checker";

/// Inputs for one report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingReportRequest {
    pub db: PathBuf,
    pub shadow_dir: Option<PathBuf>,
    /// Timestamp prefix, e.g. `2026-02-23`.
    pub session_filter: Option<String>,
    pub format: OutputFormat,
}

/// `~/.claude/interstat/metrics.db`, when a home directory is known.
pub fn default_db_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(".claude").join("interstat").join("metrics.db"))
}

/// Local calendar date stamped on markdown reports.
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Loads runs and shadow logs and renders the full report.
///
/// # Errors
/// - `DbNotFound` when the metrics database is missing.
/// - `NoData` when no review runs match.
pub fn run_routing_report(request: &RoutingReportRequest, today: NaiveDate) -> MetricsResult<String> {
    let runs = load_agent_runs(&request.db, request.session_filter.as_deref())?;
    if runs.is_empty() {
        return Err(MetricsError::NoData);
    }
    let sessions = analyze_sessions(&runs);
    let shadow = request
        .shadow_dir
        .as_deref()
        .map(parse_shadow_logs)
        .unwrap_or_default();
    Ok(generate_report(&sessions, &shadow, request.format, today))
}

/// Writes `report` to `path`, creating parent directories.
pub fn write_report(path: &Path, report: &str) -> MetricsResult<()> {
    let io_err = |source| MetricsError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, report).map_err(io_err)
}

#[derive(Debug, Default)]
struct AgentStats {
    runs: usize,
    /// Actual tiers with counts, in first-seen order.
    tiers: Vec<(ModelTier, usize)>,
    projected_tier: Option<ModelTier>,
    actual_cost: f64,
    projected_cost: f64,
}

pub fn generate_report(
    sessions: &[SessionAnalysis],
    shadow: &BTreeMap<String, Vec<ShadowEntry>>,
    format: OutputFormat,
    today: NaiveDate,
) -> String {
    let markdown = format == OutputFormat::Markdown;
    let section = |markdown_title: &str, plain_title: &str| {
        if markdown {
            format!("\n## {markdown_title}\n")
        } else {
            format!("\n=== {plain_title} ===\n")
        }
    };
    let mut lines: Vec<String> = Vec::new();

    if markdown {
        lines.push("# Heterogeneous Routing Experiment Results\n".to_string());
        lines.push(format!("**Date:** {}", today.format("%Y-%m-%d")));
        lines.push(format!("**Sessions analyzed:** {}\n", sessions.len()));
    }

    lines.push(section("Session Summary", "Session Summary"));
    let rows: Vec<Vec<String>> = sessions
        .iter()
        .map(|session| {
            let short_id: String = session.session_id.chars().take(SESSION_ID_CHARS).collect();
            vec![
                format!("{short_id}..."),
                session.agent_count().to_string(),
                group_thousands(session.total_tokens),
                format!("${:.4}", session.actual_cost),
                format!("${:.4}", session.projected_cost),
                format!("${:.4}", session.savings),
                format!("{:.1}%", session.savings_pct),
            ]
        })
        .collect();
    lines.push(format_table(
        format,
        &[
            "Session",
            "Agents",
            "Total Tokens",
            "B1 Cost",
            "B2 Projected",
            "Savings",
            "Savings %",
        ],
        &rows,
    ));

    let total_actual: f64 = sessions.iter().map(|session| session.actual_cost).sum();
    let total_projected: f64 = sessions.iter().map(|session| session.projected_cost).sum();
    let total_savings = total_actual - total_projected;
    let total_pct = if total_actual > 0.0 {
        total_savings / total_actual * 100.0
    } else {
        0.0
    };
    lines.push(format!(
        "\n**Totals:** B1=${total_actual:.4}, B2=${total_projected:.4}, Savings=${total_savings:.4} ({total_pct:.1}%)\n"
    ));

    lines.push(section("Per-Agent Model Tier Analysis", "Per-Agent Tiers"));
    let (stats, first_seen) = agent_stats(sessions);
    let rows: Vec<Vec<String>> = stats
        .iter()
        .map(|(agent, stats)| {
            let role = agent_role(agent).map(|(role, _)| role).unwrap_or("—");
            let mut tiers = stats.tiers.clone();
            tiers.sort_by(|left, right| right.1.cmp(&left.1));
            let tiers = tiers
                .iter()
                .map(|(tier, count)| format!("{tier}({count})"))
                .collect::<Vec<_>>()
                .join(", ");
            let save_pct = if stats.actual_cost > 0.0 {
                (stats.actual_cost - stats.projected_cost) / stats.actual_cost * 100.0
            } else {
                0.0
            };
            vec![
                agent.clone(),
                role.to_string(),
                stats.runs.to_string(),
                tiers,
                stats
                    .projected_tier
                    .map(|tier| tier.to_string())
                    .unwrap_or_default(),
                format!("{save_pct:.1}%"),
            ]
        })
        .collect();
    lines.push(format_table(
        format,
        &["Agent", "Role", "Runs", "Current Tier(s)", "Projected", "Savings %"],
        &rows,
    ));

    if !shadow.is_empty() {
        lines.push(section("Shadow Routing Divergence", "Shadow Data"));
        let rows: Vec<Vec<String>> = shadow
            .iter()
            .map(|(repo, entries)| {
                let downgrades = entries
                    .iter()
                    .filter(|entry| {
                        tier_rank(&entry.projected_model) < tier_rank(&entry.base_model)
                    })
                    .count();
                let upgrades = entries
                    .iter()
                    .filter(|entry| {
                        tier_rank(&entry.projected_model) > tier_rank(&entry.base_model)
                    })
                    .count();
                vec![
                    repo.clone(),
                    entries.len().to_string(),
                    downgrades.to_string(),
                    upgrades.to_string(),
                ]
            })
            .collect();
        lines.push(format_table(
            format,
            &["Repo", "Shadow Entries", "Downgrades", "Upgrades"],
            &rows,
        ));
    }

    lines.push(section("Routing Recommendations", "Recommendations"));
    if total_pct > ENFORCE_THRESHOLD_PCT {
        lines.push(format!(
            "- B2 role-aware routing projects **{total_pct:.1}% cost savings** across {} reviews.",
            sessions.len()
        ));
        lines.push("- Recommend switching `complexity.mode: shadow` → `enforce` for trial.".to_string());
    } else {
        lines.push(format!(
            "- B2 role-aware routing projects only **{total_pct:.1}% savings** — minimal benefit."
        ));
        lines.push(
            "- Recommend keeping `complexity.mode: shadow` for continued data collection."
                .to_string(),
        );
    }

    let checkers: Vec<&str> = first_seen
        .iter()
        .map(String::as_str)
        .filter(|agent| agent_role(agent).is_some_and(|(role, _)| role == CHECKER_ROLE))
        .collect();
    if !checkers.is_empty() {
        lines.push(format!(
            "- Checker agents ({}) are candidates for Haiku downgrade.",
            checkers.join(", ")
        ));
        lines.push("  - **Safety gate:** Verify unique finding rate < 5% before enabling.".to_string());
    }

    lines.join("\n")
}

/// Per-agent totals keyed by name, plus agent names in first-seen order.
fn agent_stats(sessions: &[SessionAnalysis]) -> (BTreeMap<String, AgentStats>, Vec<String>) {
    let mut stats: BTreeMap<String, AgentStats> = BTreeMap::new();
    let mut first_seen = Vec::new();
    for cost in sessions.iter().flat_map(|session| &session.agents) {
        let entry = stats.entry(cost.agent.clone()).or_insert_with(|| {
            first_seen.push(cost.agent.clone());
            AgentStats::default()
        });
        entry.runs += 1;
        match entry.tiers.iter_mut().find(|(tier, _)| *tier == cost.model_tier) {
            Some((_, count)) => *count += 1,
            None => entry.tiers.push((cost.model_tier, 1)),
        }
        entry.projected_tier = Some(cost.projected_tier);
        entry.actual_cost += cost.actual_cost;
        entry.projected_cost += cost.projected_cost;
    }
    (stats, first_seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::analysis::analyze_session;
    use crate::metrics::runs::AgentRun;

    fn session() -> SessionAnalysis {
        let run = AgentRun {
            session_id: "2026-02-23-session-abcdef".to_string(),
            agent: "interflux:review:fd-people".to_string(),
            model: Some("claude-opus-4-6".to_string()),
            input_tokens: 1_000_000,
            output_tokens: 0,
            cache_read_tokens: 0,
            total_tokens: 1_200_000,
            wall_clock_ms: 0,
            timestamp: None,
        };
        analyze_session(&run.session_id.clone(), &[run])
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 24).unwrap()
    }

    #[test]
    fn plain_report_has_sections_and_recommendation() {
        let report = generate_report(&[session()], &BTreeMap::new(), OutputFormat::Plain, today());
        assert!(report.starts_with("\n=== Session Summary ===\n"));
        assert!(report.contains("2026-02-23-s...  1       1,200,000"));
        assert!(report.contains("**Totals:** B1=$15.0000, B2=$0.8000, Savings=$14.2000 (94.7%)"));
        assert!(report.contains("fd-people  checker  1     opus(1)"));
        assert!(report.contains("projects **94.7% cost savings** across 1 reviews."));
        assert!(report.contains("- Checker agents (fd-people) are candidates for Haiku downgrade."));
        assert!(!report.contains("Shadow Data"));
    }

    #[test]
    fn markdown_report_includes_header_and_shadow_table() {
        let mut shadow = BTreeMap::new();
        shadow.insert(
            "core".to_string(),
            vec![
                ShadowEntry {
                    complexity: "C1".to_string(),
                    base_model: "sonnet".to_string(),
                    projected_model: "haiku".to_string(),
                },
                ShadowEntry {
                    complexity: "C5".to_string(),
                    base_model: "sonnet".to_string(),
                    projected_model: "opus".to_string(),
                },
            ],
        );
        let report = generate_report(&[session()], &shadow, OutputFormat::Markdown, today());
        assert!(report.starts_with("# Heterogeneous Routing Experiment Results\n\n**Date:** 2026-02-24"));
        assert!(report.contains("## Shadow Routing Divergence"));
        assert!(report.contains("| core | 2 | 1 | 1 |"));
    }

    #[test]
    fn low_savings_keep_shadow_mode() {
        let report = generate_report(&[], &BTreeMap::new(), OutputFormat::Plain, today());
        assert!(report.contains("projects only **0.0% savings**"));
        assert!(!report.contains("Checker agents"));
    }
}
