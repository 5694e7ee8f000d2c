//! Entitlement decisions and denial payloads

use serde::{Deserialize, Serialize};

use crate::Tier;

/// Result of an entitlement check against a counted limit
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the action is allowed right now
    pub allowed: bool,
    /// Current usage count
    pub current: i64,
    /// Limit for the user's tier
    pub limit: i64,
}

impl Decision {
    /// Build a decision from a count and its limit; allowed strictly below
    /// the limit, so reaching it blocks the next attempt.
    pub const fn from_count(current: i64, limit: i64) -> Self {
        Self {
            allowed: current < limit,
            current,
            limit,
        }
    }
}

/// Machine-readable reason codes for entitlement denials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialCode {
    /// Weekly upload limit reached
    UploadLimitReached,
    /// Per-material quiz limit reached
    QuizLimitReached,
    /// Chat requires the pro tier
    ChatAccessDenied,
}

impl DenialCode {
    /// Stable wire form of the code
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UploadLimitReached => "UPLOAD_LIMIT_REACHED",
            Self::QuizLimitReached => "QUIZ_LIMIT_REACHED",
            Self::ChatAccessDenied => "CHAT_ACCESS_DENIED",
        }
    }
}

impl std::fmt::Display for DenialCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured denial payload surfaced to clients.
///
/// A denied check is never a bare boolean: the client gets the reason
/// code, the limit that was hit, the tier it applies to, and where to
/// upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitExceeded {
    /// Human-readable description
    pub detail: String,
    /// Machine-readable reason code
    pub code: DenialCode,
    /// The numeric limit that was reached
    pub limit: i64,
    /// Tier the limit applies to
    pub tier: Tier,
    /// Where to start an upgrade
    pub upgrade_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_boundary_is_strict() {
        assert!(Decision::from_count(0, 1).allowed);
        assert!(!Decision::from_count(1, 1).allowed);
        assert!(!Decision::from_count(2, 1).allowed);
    }

    #[test]
    fn denial_payload_serializes_with_stable_code() {
        let payload = LimitExceeded {
            detail: "Weekly upload limit reached".to_string(),
            code: DenialCode::UploadLimitReached,
            limit: 1,
            tier: Tier::Free,
            upgrade_url: "/api/v1/billing/checkout".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["code"], "UPLOAD_LIMIT_REACHED");
        assert_eq!(json["tier"], "free");
        assert_eq!(json["limit"], 1);
    }
}
