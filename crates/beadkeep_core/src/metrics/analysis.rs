//! Per-session and per-agent cost aggregation.

use super::pricing::{agent_role, estimate_cost, normalize_agent_name, ModelTier};
use super::runs::AgentRun;
use std::collections::BTreeMap;

/// One run priced at its actual and projected tiers.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentCost {
    pub agent: String,
    pub model_tier: ModelTier,
    pub projected_tier: ModelTier,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    pub actual_cost: f64,
    pub projected_cost: f64,
    pub wall_ms: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnalysis {
    pub session_id: String,
    pub agents: Vec<AgentCost>,
    pub total_input: i64,
    pub total_output: i64,
    pub total_tokens: i64,
    pub actual_cost: f64,
    pub projected_cost: f64,
    /// `actual - projected`, zero when nothing was spent.
    pub savings: f64,
    pub savings_pct: f64,
}

impl SessionAnalysis {
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

/// Prices every run of one session.
pub fn analyze_session(session_id: &str, runs: &[AgentRun]) -> SessionAnalysis {
    let agents: Vec<AgentCost> = runs.iter().map(price_run).collect();

    let actual_cost: f64 = agents.iter().map(|agent| agent.actual_cost).sum();
    let projected_cost: f64 = agents.iter().map(|agent| agent.projected_cost).sum();
    let (savings, savings_pct) = if actual_cost > 0.0 {
        let savings = actual_cost - projected_cost;
        (savings, savings / actual_cost * 100.0)
    } else {
        (0.0, 0.0)
    };

    SessionAnalysis {
        session_id: session_id.to_string(),
        total_input: agents.iter().map(|agent| agent.input_tokens).sum(),
        total_output: agents.iter().map(|agent| agent.output_tokens).sum(),
        total_tokens: agents.iter().map(|agent| agent.total_tokens).sum(),
        agents,
        actual_cost,
        projected_cost,
        savings,
        savings_pct,
    }
}

/// Groups runs by session id and analyzes each group, in session order.
pub fn analyze_sessions(runs: &[AgentRun]) -> Vec<SessionAnalysis> {
    let mut grouped: BTreeMap<&str, Vec<AgentRun>> = BTreeMap::new();
    for run in runs {
        grouped
            .entry(run.session_id.as_str())
            .or_default()
            .push(run.clone());
    }
    grouped
        .into_iter()
        .map(|(session_id, runs)| analyze_session(session_id, &runs))
        .collect()
}

fn price_run(run: &AgentRun) -> AgentCost {
    let agent = normalize_agent_name(&run.agent).to_string();
    let model_tier = ModelTier::from_model_id(run.model.as_deref());
    let actual_cost = estimate_cost(run.input_tokens, run.output_tokens, model_tier);
    let (projected_tier, projected_cost) = match agent_role(&agent) {
        Some((_, tier)) => (tier, estimate_cost(run.input_tokens, run.output_tokens, tier)),
        None => (model_tier, actual_cost),
    };

    AgentCost {
        agent,
        model_tier,
        projected_tier,
        input_tokens: run.input_tokens,
        output_tokens: run.output_tokens,
        total_tokens: run.total_tokens,
        actual_cost,
        projected_cost,
        wall_ms: run.wall_clock_ms,
    }
}
