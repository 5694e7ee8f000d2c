//! Subscription tier types

use serde::{Deserialize, Serialize};

/// Subscription tier levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Free tier - limited uploads and quizzes, no chat
    Free,
    /// Pro tier - raised limits, chat enabled
    Pro,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Pro => write!(f, "pro"),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = TierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            _ => Err(TierParseError(s.to_string())),
        }
    }
}

/// Error parsing a tier string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid tier: {0}")]
pub struct TierParseError(pub String);

/// Numeric limits granted by a tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierLimits {
    /// Material uploads allowed per rolling week
    pub uploads_per_week: i64,
    /// Quizzes allowed per material, over the material's lifetime
    pub quizzes_per_material: i64,
    /// Whether the AI tutor chat is available
    pub chat_enabled: bool,
}

/// Limits for every tier, supplied via configuration so operators can
/// tune them without a code change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlanLimits {
    pub free: TierLimits,
    pub pro: TierLimits,
}

impl PlanLimits {
    /// Look up the limits for a tier
    pub const fn for_tier(&self, tier: Tier) -> TierLimits {
        match tier {
            Tier::Free => self.free,
            Tier::Pro => self.pro,
        }
    }
}
