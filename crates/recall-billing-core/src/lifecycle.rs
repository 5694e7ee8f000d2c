//! Subscription lifecycle engine
//!
//! The state machine that reconciles provider webhook events and local
//! lifecycle actions into the per-user subscription row. Events carry
//! absolute target state (status and timestamps from the provider), so
//! applying the same event twice recomputes the same row: idempotency by
//! recomputation, with no stored event log.
//!
//! Events that cannot be reconciled (no user reference in the checkout
//! metadata, no row for a customer id) are logged and dropped, never
//! raised to the transport layer: the provider must still get its
//! acknowledgment, or it will redeliver a non-actionable event forever.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use recall_db::{SubscriptionRepository, SubscriptionRow};
use recall_types::{CheckoutSession, SubscriptionStatus};

use crate::clock::Clock;
use crate::error::BillingError;
use crate::provider::PaymentProvider;
use crate::webhook::{
    CheckoutCompletedData, EventKind, InvoiceEventData, SubscriptionEventData, WebhookEvent,
};

/// Map a provider status string onto the local status set.
///
/// `unpaid` collapses into `past_due`; anything unrecognized falls to
/// `free` so an unknown provider state never grants access.
fn map_provider_status(status: &str) -> SubscriptionStatus {
    match status {
        "trialing" => SubscriptionStatus::Trialing,
        "active" => SubscriptionStatus::Active,
        "past_due" | "unpaid" => SubscriptionStatus::PastDue,
        "canceled" => SubscriptionStatus::Canceled,
        _ => SubscriptionStatus::Free,
    }
}

/// Subscription lifecycle engine
#[derive(Clone)]
pub struct LifecycleEngine<S, P> {
    subscriptions: Arc<S>,
    provider: Arc<P>,
    clock: Arc<dyn Clock>,
}

impl<S, P> LifecycleEngine<S, P>
where
    S: SubscriptionRepository,
    P: PaymentProvider,
{
    /// Create an engine over the given store and provider
    pub fn new(subscriptions: Arc<S>, provider: Arc<P>, clock: Arc<dyn Clock>) -> Self {
        Self {
            subscriptions,
            provider,
            clock,
        }
    }

    // ------------------------------------------------------------------
    // Webhook ingestion
    // ------------------------------------------------------------------

    /// Apply a verified webhook event to the local subscription state.
    ///
    /// Errors are store or provider failures only; unreconcilable events
    /// resolve to `Ok(())` after a diagnostic log.
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    pub async fn apply(&self, event: &WebhookEvent) -> Result<(), BillingError> {
        match &event.kind {
            EventKind::CheckoutCompleted(data) => self.on_checkout_completed(data).await,
            EventKind::SubscriptionUpdated(data) => self.on_subscription_updated(data).await,
            EventKind::SubscriptionDeleted(data) => self.on_subscription_deleted(data).await,
            EventKind::InvoicePaymentSucceeded(data) => {
                self.on_invoice_payment(data, SubscriptionStatus::Active).await
            }
            EventKind::InvoicePaymentFailed(data) => {
                self.on_invoice_payment(data, SubscriptionStatus::PastDue).await
            }
            EventKind::Ignored { event_type } => {
                debug!(event_type = %event_type, "Skipping ignored webhook event");
                Ok(())
            }
        }
    }

    async fn on_checkout_completed(
        &self,
        data: &CheckoutCompletedData,
    ) -> Result<(), BillingError> {
        let Some(user_ref) = data.user_ref.as_deref() else {
            warn!(session_id = %data.session_id, "Checkout session has no user reference, dropping");
            return Ok(());
        };

        let Ok(user_id) = Uuid::parse_str(user_ref) else {
            warn!(session_id = %data.session_id, user_ref = %user_ref, "Unparseable user reference, dropping");
            return Ok(());
        };

        let Some(subscription_id) = data.subscription_id.as_deref() else {
            debug!(session_id = %data.session_id, "Checkout session without subscription, nothing to sync");
            return Ok(());
        };

        // The session payload only carries ids; the subscription object is
        // the authoritative source for status and dates.
        let provider_sub = self.provider.get_subscription(subscription_id).await?;

        let status = if provider_sub.status == "trialing" {
            SubscriptionStatus::Trialing
        } else {
            SubscriptionStatus::Active
        };

        let row = self.get_or_create(user_id).await?;
        let mut next = row;
        if data.customer_id.is_some() {
            next.stripe_customer_id = data.customer_id.clone();
        }
        next.stripe_subscription_id = Some(subscription_id.to_string());
        self.merge_provider_state(
            &mut next,
            status,
            provider_sub.trial_end,
            Some(provider_sub.current_period_start),
            Some(provider_sub.current_period_end),
        );
        self.subscriptions.update(&next).await?;

        info!(user_id = %user_id, status = %status, "Subscription established from checkout");
        Ok(())
    }

    async fn on_subscription_updated(
        &self,
        data: &SubscriptionEventData,
    ) -> Result<(), BillingError> {
        let Some(row) = self
            .subscriptions
            .find_by_stripe_customer_id(&data.customer_id)
            .await?
        else {
            warn!(customer_id = %data.customer_id, "No subscription for customer, dropping update event");
            return Ok(());
        };

        let status = map_provider_status(&data.status);

        let mut next = row;
        next.stripe_subscription_id = Some(data.subscription_id.clone());
        self.merge_provider_state(
            &mut next,
            status,
            data.trial_end,
            Some(data.period_start),
            Some(data.period_end),
        );
        self.subscriptions.update(&next).await?;

        info!(user_id = %next.user_id, status = %status, "Subscription updated from provider");
        Ok(())
    }

    async fn on_subscription_deleted(
        &self,
        data: &SubscriptionEventData,
    ) -> Result<(), BillingError> {
        let Some(row) = self
            .subscriptions
            .find_by_stripe_customer_id(&data.customer_id)
            .await?
        else {
            warn!(customer_id = %data.customer_id, "No subscription for customer, dropping delete event");
            return Ok(());
        };

        let mut next = row;
        self.downgrade_to_free(&mut next);
        self.subscriptions.update(&next).await?;

        info!(user_id = %next.user_id, "Subscription deleted by provider, downgraded to free");
        Ok(())
    }

    async fn on_invoice_payment(
        &self,
        data: &InvoiceEventData,
        status: SubscriptionStatus,
    ) -> Result<(), BillingError> {
        if data.subscription_id.is_none() {
            // One-off invoice, not part of the subscription lifecycle
            return Ok(());
        }

        let Some(row) = self
            .subscriptions
            .find_by_stripe_customer_id(&data.customer_id)
            .await?
        else {
            warn!(customer_id = %data.customer_id, "No subscription for customer, dropping invoice event");
            return Ok(());
        };

        let mut next = row;
        next.set_status(status);
        if status == SubscriptionStatus::Active {
            // A paid invoice opens the next billing window
            next.current_period_end = Some(data.period_end);
        }
        next.updated_at = self.clock.now();
        self.subscriptions.update(&next).await?;

        info!(user_id = %next.user_id, status = %status, "Invoice payment applied");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Local actions
    // ------------------------------------------------------------------

    /// Start a checkout session for the pro plan.
    ///
    /// Rejected before any provider call if the user is already in a pro
    /// state, so one user can never hold two provider subscriptions.
    #[instrument(skip(self, email))]
    pub async fn create_checkout(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<CheckoutSession, BillingError> {
        let row = self.get_or_create(user_id).await?;

        if matches!(
            row.status(),
            SubscriptionStatus::Trialing | SubscriptionStatus::Active | SubscriptionStatus::PastDue
        ) {
            return Err(BillingError::AlreadySubscribed);
        }

        let customer_id = match row.stripe_customer_id.clone() {
            Some(id) => id,
            None => {
                let customer = self
                    .provider
                    .create_customer(email, &user_id.to_string())
                    .await?;

                let mut next = row;
                next.stripe_customer_id = Some(customer.id.clone());
                next.updated_at = self.clock.now();
                self.subscriptions.update(&next).await?;

                customer.id
            }
        };

        self.provider
            .create_checkout_session(&customer_id, &user_id.to_string())
            .await
    }

    /// Cancel the user's subscription.
    ///
    /// The provider-side cancel is best-effort: a failure is logged and
    /// the local row still advances to `free`, because local state is
    /// what entitlement reads and the provider stops billing through its
    /// own deletion event.
    #[instrument(skip(self))]
    pub async fn cancel(&self, user_id: Uuid) -> Result<SubscriptionRow, BillingError> {
        let row = self.get_or_create(user_id).await?;

        if row.status() == SubscriptionStatus::Free {
            return Err(BillingError::NoActiveSubscription);
        }

        if let Some(subscription_id) = row.stripe_subscription_id.as_deref() {
            if let Err(e) = self.provider.cancel_subscription(subscription_id).await {
                warn!(
                    user_id = %user_id,
                    subscription_id = %subscription_id,
                    error = %e,
                    "Provider-side cancel failed, local downgrade proceeds"
                );
            }
        }

        let mut next = row;
        self.downgrade_to_free(&mut next);
        let updated = self.subscriptions.update(&next).await?;

        info!(user_id = %user_id, "Subscription canceled locally");
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Shared state computation
    // ------------------------------------------------------------------

    async fn get_or_create(&self, user_id: Uuid) -> Result<SubscriptionRow, BillingError> {
        let week_reset_at = self.clock.now() + Duration::days(7);
        Ok(self
            .subscriptions
            .get_or_create(user_id, week_reset_at)
            .await?)
    }

    /// Merge authoritative provider state into the row.
    ///
    /// `trial_start` is written once: set when the row first enters
    /// `trialing` and preserved on every later event, even those carrying
    /// no trial fields.
    fn merge_provider_state(
        &self,
        row: &mut SubscriptionRow,
        status: SubscriptionStatus,
        trial_end: Option<chrono::DateTime<chrono::Utc>>,
        period_start: Option<chrono::DateTime<chrono::Utc>>,
        period_end: Option<chrono::DateTime<chrono::Utc>>,
    ) {
        let now = self.clock.now();

        row.set_status(status);
        if status == SubscriptionStatus::Trialing && row.trial_start.is_none() {
            row.trial_start = Some(now);
        }
        row.trial_end = trial_end;
        row.current_period_start = period_start;
        row.current_period_end = period_end;
        row.updated_at = now;
    }

    /// Local cancellation and provider deletion converge on the same row
    /// shape: status `free`, provider subscription reference and
    /// trial/period windows cleared. `trial_start` stays, it marks that
    /// the one trial was consumed.
    fn downgrade_to_free(&self, row: &mut SubscriptionRow) {
        row.set_status(SubscriptionStatus::Free);
        row.stripe_subscription_id = None;
        row.trial_end = None;
        row.current_period_start = None;
        row.current_period_end = None;
        row.updated_at = self.clock.now();
    }
}

impl<S, P> std::fmt::Debug for LifecycleEngine<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine").finish()
    }
}
