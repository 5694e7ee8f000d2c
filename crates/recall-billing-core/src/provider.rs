//! Payment provider abstraction

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use recall_types::CheckoutSession;

use crate::BillingError;

/// Provider-side customer record
#[derive(Debug, Clone)]
pub struct ProviderCustomer {
    /// Provider customer ID
    pub id: String,
    /// Customer email
    pub email: Option<String>,
}

/// Provider-side subscription snapshot.
///
/// Carries the authoritative absolute state the lifecycle engine syncs
/// the local row to.
#[derive(Debug, Clone)]
pub struct ProviderSubscription {
    /// Provider subscription ID
    pub id: String,
    /// Provider customer ID
    pub customer_id: String,
    /// Provider status string (e.g. "trialing", "active", "past_due")
    pub status: String,
    /// Trial end, if a trial applies
    pub trial_end: Option<DateTime<Utc>>,
    /// Current billing period start
    pub current_period_start: DateTime<Utc>,
    /// Current billing period end
    pub current_period_end: DateTime<Utc>,
}

/// Payment provider trait
///
/// Abstracts payment processing so the lifecycle engine can be exercised
/// against a fake provider in tests.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a customer, tagging it with the internal user reference
    async fn create_customer(
        &self,
        email: &str,
        user_ref: &str,
    ) -> Result<ProviderCustomer, BillingError>;

    /// Create a subscription-mode checkout session for the configured plan.
    ///
    /// `user_ref` is carried in the session metadata so the completion
    /// webhook can be correlated back to the internal user.
    async fn create_checkout_session(
        &self,
        customer_id: &str,
        user_ref: &str,
    ) -> Result<CheckoutSession, BillingError>;

    /// Retrieve a subscription by provider ID
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, BillingError>;

    /// Cancel a subscription by provider ID
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), BillingError>;
}
