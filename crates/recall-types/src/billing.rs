//! Billing and checkout types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{SubscriptionStatus, Tier};

/// Checkout session handed back to the client for redirect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Stripe checkout session ID
    pub session_id: String,
    /// Checkout URL to redirect the user to
    pub url: String,
}

/// Client-facing view of a user's subscription and remaining allowances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionOverview {
    /// Subscription status
    pub status: SubscriptionStatus,
    /// Tier derived from the status
    pub tier: Tier,
    /// Trial end, if a trial is or was in effect
    pub trial_end: Option<DateTime<Utc>>,
    /// End of the current billing period
    pub current_period_end: Option<DateTime<Utc>>,
    /// Uploads used in the current rolling week
    pub uploads_used: i64,
    /// Weekly upload limit for the tier
    pub uploads_limit: i64,
    /// Per-material quiz limit for the tier
    pub quizzes_per_material_limit: i64,
    /// Whether the AI tutor chat is available
    pub can_use_chat: bool,
}
