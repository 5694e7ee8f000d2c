//! Entitlement gate
//!
//! The synchronous allow/deny decision consulted by every rate- or
//! feature-limited operation. The gate reads the subscription (lazily
//! creating it), applies the lazy weekly reset, resolves the tier, and
//! compares counts against the configured limits. It never increments
//! usage itself (that is an explicit post-success call on
//! [`UsageCounters`](crate::UsageCounters)) and never talks to the payment
//! provider.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use recall_db::{MaterialUsageRepository, SubscriptionRepository};
use recall_types::{Decision, PlanLimits, SubscriptionOverview};

use crate::clock::Clock;
use crate::error::BillingError;
use crate::usage::UsageCounters;

/// Entitlement gate over the subscription store
#[derive(Clone)]
pub struct EntitlementGate<S, M> {
    counters: UsageCounters<S, M>,
    limits: PlanLimits,
}

impl<S, M> EntitlementGate<S, M>
where
    S: SubscriptionRepository,
    M: MaterialUsageRepository,
{
    /// Create a gate over the given repositories
    pub fn new(
        subscriptions: Arc<S>,
        materials: Arc<M>,
        limits: PlanLimits,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            counters: UsageCounters::new(subscriptions, materials, clock),
            limits,
        }
    }

    /// The usage counters backing this gate
    pub fn counters(&self) -> &UsageCounters<S, M> {
        &self.counters
    }

    /// Can the user upload another material this week?
    #[instrument(skip(self))]
    pub async fn can_upload(&self, user_id: Uuid) -> Result<Decision, BillingError> {
        let row = self.counters.get_or_create(user_id).await?;
        let row = self.counters.reset_if_due(row).await?;

        let limit = self.limits.for_tier(row.status().tier()).uploads_per_week;
        Ok(Decision::from_count(row.uploads_this_week, limit))
    }

    /// Can the user create another quiz for this material?
    ///
    /// An absent material denies with a zero count; the caller's own
    /// not-found handling decides how to surface that.
    #[instrument(skip(self))]
    pub async fn can_create_quiz(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<Decision, BillingError> {
        let row = self.counters.get_or_create(user_id).await?;
        let limit = self
            .limits
            .for_tier(row.status().tier())
            .quizzes_per_material;

        match self.counters.quiz_count(material_id).await? {
            Some(current) => Ok(Decision::from_count(current, limit)),
            None => Ok(Decision {
                allowed: false,
                current: 0,
                limit,
            }),
        }
    }

    /// Is the AI tutor chat available to the user?
    #[instrument(skip(self))]
    pub async fn can_use_chat(&self, user_id: Uuid) -> Result<bool, BillingError> {
        let row = self.counters.get_or_create(user_id).await?;
        Ok(self.limits.for_tier(row.status().tier()).chat_enabled)
    }

    /// Client-facing subscription status with remaining allowances
    #[instrument(skip(self))]
    pub async fn overview(&self, user_id: Uuid) -> Result<SubscriptionOverview, BillingError> {
        let row = self.counters.get_or_create(user_id).await?;
        let row = self.counters.reset_if_due(row).await?;

        let status = row.status();
        let tier = status.tier();
        let limits = self.limits.for_tier(tier);

        Ok(SubscriptionOverview {
            status,
            tier,
            trial_end: row.trial_end,
            current_period_end: row.current_period_end,
            uploads_used: row.uploads_this_week,
            uploads_limit: limits.uploads_per_week,
            quizzes_per_material_limit: limits.quizzes_per_material,
            can_use_chat: limits.chat_enabled,
        })
    }
}

impl<S, M> std::fmt::Debug for EntitlementGate<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementGate").finish()
    }
}
