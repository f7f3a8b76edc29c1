//! Model tiers, per-tier prices and the agent role table.

use std::fmt::{Display, Formatter};

/// Pricing tier of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelTier {
    Opus,
    Sonnet,
    Haiku,
    Unknown,
}

/// Known model ids and their tiers.
const MODEL_TIERS: &[(&str, ModelTier)] = &[
    ("claude-opus-4-6", ModelTier::Opus),
    ("claude-opus-4-5-20251101", ModelTier::Opus),
    ("claude-sonnet-4-6", ModelTier::Sonnet),
    ("claude-sonnet-4-5-20250929", ModelTier::Sonnet),
    ("claude-haiku-4-5-20251001", ModelTier::Haiku),
];

/// Review agent → (role, tier the role routes to).
pub const AGENT_ROLES: &[(&str, &str, ModelTier)] = &[
    ("fd-architecture", "planner", ModelTier::Opus),
    ("fd-systems", "planner", ModelTier::Opus),
    ("fd-correctness", "reviewer", ModelTier::Sonnet),
    ("fd-quality", "reviewer", ModelTier::Sonnet),
    ("fd-safety", "reviewer", ModelTier::Sonnet),
    ("fd-performance", "editor", ModelTier::Sonnet),
    ("fd-user-product", "editor", ModelTier::Sonnet),
    ("fd-game-design", "editor", ModelTier::Sonnet),
    ("fd-perception", "checker", ModelTier::Haiku),
    ("fd-resilience", "checker", ModelTier::Haiku),
    ("fd-decisions", "checker", ModelTier::Haiku),
    ("fd-people", "checker", ModelTier::Haiku),
];

const AGENT_PREFIXES: [&str; 2] = ["interflux:review:", "interflux:"];

impl ModelTier {
    /// Tier for a model id; missing or unlisted ids are `Unknown`.
    pub fn from_model_id(model: Option<&str>) -> Self {
        model
            .and_then(|model| {
                MODEL_TIERS
                    .iter()
                    .find(|(id, _)| *id == model)
                    .map(|(_, tier)| *tier)
            })
            .unwrap_or(Self::Unknown)
    }

    /// `(input, output)` dollars per million tokens.
    pub fn rates(self) -> Option<(f64, f64)> {
        match self {
            Self::Opus => Some((15.0, 75.0)),
            Self::Sonnet => Some((3.0, 15.0)),
            Self::Haiku => Some((0.80, 4.0)),
            Self::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opus => "opus",
            Self::Sonnet => "sonnet",
            Self::Haiku => "haiku",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for ModelTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strips the plugin namespace from an agent name.
pub fn normalize_agent_name(agent: &str) -> &str {
    AGENT_PREFIXES
        .iter()
        .find_map(|prefix| agent.strip_prefix(*prefix))
        .unwrap_or(agent)
}

/// Role and routed tier for a normalized agent name.
pub fn agent_role(agent: &str) -> Option<(&'static str, ModelTier)> {
    AGENT_ROLES
        .iter()
        .find(|(name, _, _)| *name == agent)
        .map(|(_, role, tier)| (*role, *tier))
}

/// Dollar cost of a run at `tier`; zero for unknown tiers.
pub fn estimate_cost(input_tokens: i64, output_tokens: i64, tier: ModelTier) -> f64 {
    match tier.rates() {
        Some((input_rate, output_rate)) => {
            (input_tokens as f64 * input_rate + output_tokens as f64 * output_rate) / 1_000_000.0
        }
        None => 0.0,
    }
}

/// Ordering of tier names used in shadow logs; unknown names rank `0`.
pub fn tier_rank(tier: &str) -> u8 {
    match tier {
        "haiku" => 1,
        "sonnet" => 2,
        "opus" => 3,
        _ => 0,
    }
}
