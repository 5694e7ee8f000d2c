//! Repository traits
//!
//! Define async repository interfaces for database operations. The store is
//! the sole writer of persisted state: callers compute next-state values and
//! delegate the write through these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::SubscriptionRow;

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find the subscription for a user
    async fn find_by_user_id(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRow>>;

    /// Find a subscription by Stripe customer ID
    async fn find_by_stripe_customer_id(
        &self,
        customer_id: &str,
    ) -> DbResult<Option<SubscriptionRow>>;

    /// Get the user's subscription, creating a default free one if absent.
    ///
    /// This is the single lazy-create point: every entry path that may see a
    /// new user goes through it, so the creation defaults (status `free`,
    /// zero uploads, `week_reset_at` one week out) are defined once.
    /// Idempotent under concurrent callers for the same user.
    async fn get_or_create(
        &self,
        user_id: Uuid,
        week_reset_at: DateTime<Utc>,
    ) -> DbResult<SubscriptionRow>;

    /// Write back every mutable column of the row.
    ///
    /// Callers read the row, compute the absolute next state, and delegate
    /// the write here; the row's `id` selects the record.
    async fn update(&self, row: &SubscriptionRow) -> DbResult<SubscriptionRow>;
}

/// Per-material usage counter access.
///
/// The quiz counter lives on the material row, scoped to the material's
/// lifetime; there is no time-window reset for it.
#[async_trait]
pub trait MaterialUsageRepository: Send + Sync {
    /// Current quiz count for a material, or `None` if the material is absent
    async fn get_quiz_count(&self, material_id: Uuid) -> DbResult<Option<i64>>;

    /// Overwrite the quiz count for a material; no-op if the material is absent
    async fn set_quiz_count(&self, material_id: Uuid, count: i64) -> DbResult<()>;
}
