//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use recall_types::SubscriptionStatus;

/// Subscription row from the database, one per user.
///
/// `status` is stored as text; [`SubscriptionRow::status`] parses it with a
/// safe fallback to `free`, so an unrecognized value never grants access.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub status: String,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub uploads_this_week: i64,
    pub week_reset_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    /// Parse the stored status, defaulting to `free` on unknown values
    pub fn status(&self) -> SubscriptionStatus {
        self.status.parse().unwrap_or(SubscriptionStatus::Free)
    }

    /// Set the stored status from the typed value
    pub fn set_status(&mut self, status: SubscriptionStatus) {
        self.status = status.as_str().to_string();
    }
}
