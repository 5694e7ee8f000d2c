//! Subscription status

use serde::{Deserialize, Serialize};

use crate::Tier;

/// Subscription status
///
/// `Free` is both the initial state for a new user and the state a
/// subscription returns to after cancellation; a user can re-subscribe
/// from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No paid subscription
    Free,
    /// In trial period
    Trialing,
    /// Subscription is active and paid
    Active,
    /// Payment is past due, provider is retrying
    PastDue,
    /// Subscription was canceled by the provider
    Canceled,
}

impl SubscriptionStatus {
    /// Stable string form, matches the persisted column value
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
        }
    }

    /// Tier granted by this status: trialing, active, and past_due keep
    /// pro access (past_due keeps it while the provider retries payment).
    pub const fn tier(&self) -> Tier {
        match self {
            Self::Trialing | Self::Active | Self::PastDue => Tier::Pro,
            Self::Free | Self::Canceled => Tier::Free,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "trialing" => Ok(Self::Trialing),
            "active" => Ok(Self::Active),
            "past_due" => Ok(Self::PastDue),
            "canceled" => Ok(Self::Canceled),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

/// Error parsing a subscription status string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid subscription status: {0}")]
pub struct StatusParseError(pub String);
