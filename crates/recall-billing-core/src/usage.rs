//! Usage counters
//!
//! The weekly upload counter lives on the subscription row and resets
//! lazily: no scheduler, the reset happens on the next read that observes
//! an elapsed window. Windows are rolling 7-day periods anchored to the
//! last reset, not calendar weeks.
//!
//! Increments are check-then-increment with no atomicity barrier beyond
//! the store's per-row update. Under concurrent requests for one user the
//! count can exceed the limit by at most the number of in-flight requests;
//! these are soft usage caps, so that bound is accepted rather than paid
//! for with locking.

use std::sync::Arc;

use chrono::Duration;
use tracing::instrument;
use uuid::Uuid;

use recall_db::{MaterialUsageRepository, SubscriptionRepository, SubscriptionRow};

use crate::clock::Clock;
use crate::error::BillingError;

/// Length of the rolling usage window
const WEEK_DAYS: i64 = 7;

/// Upload and quiz counters, backed by the store
#[derive(Clone)]
pub struct UsageCounters<S, M> {
    subscriptions: Arc<S>,
    materials: Arc<M>,
    clock: Arc<dyn Clock>,
}

impl<S, M> UsageCounters<S, M>
where
    S: SubscriptionRepository,
    M: MaterialUsageRepository,
{
    /// Create usage counters over the given repositories
    pub fn new(subscriptions: Arc<S>, materials: Arc<M>, clock: Arc<dyn Clock>) -> Self {
        Self {
            subscriptions,
            materials,
            clock,
        }
    }

    /// Get the user's subscription row, lazily creating the default free one
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<SubscriptionRow, BillingError> {
        let week_reset_at = self.clock.now() + Duration::days(WEEK_DAYS);
        Ok(self
            .subscriptions
            .get_or_create(user_id, week_reset_at)
            .await?)
    }

    /// Reset the weekly upload counter if its window has elapsed.
    ///
    /// Returns the row unchanged when the reset is not yet due. After a
    /// reset, `week_reset_at` strictly increases and the count is zero.
    pub async fn reset_if_due(
        &self,
        row: SubscriptionRow,
    ) -> Result<SubscriptionRow, BillingError> {
        let now = self.clock.now();
        if now < row.week_reset_at {
            return Ok(row);
        }

        let mut next = row;
        next.uploads_this_week = 0;
        next.week_reset_at = now + Duration::days(WEEK_DAYS);
        next.updated_at = now;

        Ok(self.subscriptions.update(&next).await?)
    }

    /// Charge one upload to the user's weekly counter.
    ///
    /// Call only after the upload has durably succeeded; a crash between
    /// the success and this call under-counts, which fails open and is
    /// preferred over charging for failed operations.
    #[instrument(skip(self))]
    pub async fn record_upload(&self, user_id: Uuid) -> Result<(), BillingError> {
        let row = self.get_or_create(user_id).await?;
        let row = self.reset_if_due(row).await?;

        let mut next = row;
        next.uploads_this_week += 1;
        next.updated_at = self.clock.now();
        self.subscriptions.update(&next).await?;

        Ok(())
    }

    /// Current quiz count for a material, `None` if the material is absent
    pub async fn quiz_count(&self, material_id: Uuid) -> Result<Option<i64>, BillingError> {
        Ok(self.materials.get_quiz_count(material_id).await?)
    }

    /// Charge one quiz to the material's lifetime counter.
    ///
    /// Same post-success contract as [`record_upload`](Self::record_upload).
    #[instrument(skip(self))]
    pub async fn record_quiz(&self, material_id: Uuid) -> Result<(), BillingError> {
        let current = self
            .materials
            .get_quiz_count(material_id)
            .await?
            .unwrap_or(0);
        self.materials
            .set_quiz_count(material_id, current + 1)
            .await?;

        Ok(())
    }
}

impl<S, M> std::fmt::Debug for UsageCounters<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageCounters").finish()
    }
}
