//! Billing service
//!
//! Facade composing the webhook boundary, the lifecycle engine, the
//! entitlement gate, and the usage counters over shared repositories.
//! Services hold one of these behind an `Arc` and route everything
//! billing-shaped through it.

use std::sync::Arc;

use uuid::Uuid;

use recall_db::{MaterialUsageRepository, SubscriptionRepository};
use recall_types::{CheckoutSession, Decision, SubscriptionOverview};

use crate::clock::{Clock, SystemClock};
use crate::config::BillingConfig;
use crate::entitlement::EntitlementGate;
use crate::error::BillingError;
use crate::lifecycle::LifecycleEngine;
use crate::provider::PaymentProvider;
use crate::usage::UsageCounters;
use crate::webhook::WebhookHandler;

/// Billing service
#[derive(Clone)]
pub struct BillingService<S, M, P> {
    webhook: WebhookHandler,
    engine: LifecycleEngine<S, P>,
    gate: EntitlementGate<S, M>,
    config: BillingConfig,
}

impl<S, M, P> BillingService<S, M, P>
where
    S: SubscriptionRepository,
    M: MaterialUsageRepository,
    P: PaymentProvider,
{
    /// Create a billing service with the system clock
    pub fn new(
        subscriptions: Arc<S>,
        materials: Arc<M>,
        provider: Arc<P>,
        config: BillingConfig,
    ) -> Self {
        Self::with_clock(
            subscriptions,
            materials,
            provider,
            config,
            Arc::new(SystemClock),
        )
    }

    /// Create a billing service with an injected clock (tests)
    pub fn with_clock(
        subscriptions: Arc<S>,
        materials: Arc<M>,
        provider: Arc<P>,
        config: BillingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let webhook = WebhookHandler::new(config.stripe_webhook_secret.clone());
        let engine = LifecycleEngine::new(subscriptions.clone(), provider, clock.clone());
        let gate = EntitlementGate::new(subscriptions, materials, config.limits, clock);

        Self {
            webhook,
            engine,
            gate,
            config,
        }
    }

    /// Service configuration
    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Webhook path
    // ------------------------------------------------------------------

    /// Verify, decode, and apply one webhook delivery.
    ///
    /// Verification failures surface as [`BillingError::WebhookError`];
    /// structurally valid but unreconcilable events resolve to `Ok(())`
    /// so the provider gets its acknowledgment.
    pub async fn process_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<(), BillingError> {
        let event = self.webhook.verify_and_parse(payload, signature)?;
        self.engine.apply(&event).await
    }

    // ------------------------------------------------------------------
    // Local lifecycle actions
    // ------------------------------------------------------------------

    /// Start a checkout session for the pro plan
    pub async fn create_checkout(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<CheckoutSession, BillingError> {
        self.engine.create_checkout(user_id, email).await
    }

    /// Cancel the user's subscription and downgrade to free
    pub async fn cancel(&self, user_id: Uuid) -> Result<(), BillingError> {
        self.engine.cancel(user_id).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entitlement path
    // ------------------------------------------------------------------

    /// Can the user upload another material this week?
    pub async fn can_upload(&self, user_id: Uuid) -> Result<Decision, BillingError> {
        self.gate.can_upload(user_id).await
    }

    /// Can the user create another quiz for this material?
    pub async fn can_create_quiz(
        &self,
        user_id: Uuid,
        material_id: Uuid,
    ) -> Result<Decision, BillingError> {
        self.gate.can_create_quiz(user_id, material_id).await
    }

    /// Is the AI tutor chat available to the user?
    pub async fn can_use_chat(&self, user_id: Uuid) -> Result<bool, BillingError> {
        self.gate.can_use_chat(user_id).await
    }

    /// Client-facing subscription status
    pub async fn overview(&self, user_id: Uuid) -> Result<SubscriptionOverview, BillingError> {
        self.gate.overview(user_id).await
    }

    // ------------------------------------------------------------------
    // Post-success usage charging
    // ------------------------------------------------------------------

    /// Charge one upload after it durably succeeded
    pub async fn record_upload(&self, user_id: Uuid) -> Result<(), BillingError> {
        self.counters().record_upload(user_id).await
    }

    /// Charge one quiz after it durably succeeded
    pub async fn record_quiz(&self, material_id: Uuid) -> Result<(), BillingError> {
        self.counters().record_quiz(material_id).await
    }

    fn counters(&self) -> &UsageCounters<S, M> {
        self.gate.counters()
    }
}

impl<S, M, P> std::fmt::Debug for BillingService<S, M, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingService").finish_non_exhaustive()
    }
}
