//! Stripe payment provider implementation

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use recall_types::CheckoutSession;

use crate::config::BillingConfig;
use crate::error::BillingError;
use crate::provider::{PaymentProvider, ProviderCustomer, ProviderSubscription};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Stripe never gets to hold a webhook delivery hostage: a stuck API call
/// must return before the provider's own delivery timeout would fire.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Stripe payment provider
#[derive(Clone)]
pub struct StripeProvider {
    client: Client,
    config: BillingConfig,
}

impl StripeProvider {
    /// Create a new Stripe provider
    pub fn new(config: BillingConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Make an authenticated request to Stripe
    async fn stripe_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<T, BillingError> {
        let url = format!("{STRIPE_API_BASE}{endpoint}");

        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.config.stripe_secret_key, Option::<&str>::None);

        if let Some(form_data) = form {
            request = request.form(form_data);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Stripe API request failed");
            BillingError::ProviderError(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Stripe API error");
            return Err(BillingError::ProviderError(format!(
                "Stripe API error: {status}"
            )));
        }

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Stripe response");
            BillingError::Internal(e.to_string())
        })
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    #[instrument(skip(self, email))]
    async fn create_customer(
        &self,
        email: &str,
        user_ref: &str,
    ) -> Result<ProviderCustomer, BillingError> {
        debug!(user_ref = %user_ref, "Creating Stripe customer");

        let form = [("email", email), ("metadata[user_id]", user_ref)];

        let customer: StripeCustomer = self
            .stripe_request(reqwest::Method::POST, "/customers", Some(&form))
            .await?;

        Ok(ProviderCustomer {
            id: customer.id,
            email: customer.email,
        })
    }

    #[instrument(skip(self))]
    async fn create_checkout_session(
        &self,
        customer_id: &str,
        user_ref: &str,
    ) -> Result<CheckoutSession, BillingError> {
        debug!(customer_id = %customer_id, "Creating checkout session");

        let trial_days = self.config.trial_days.to_string();
        let form = [
            ("customer", customer_id),
            ("mode", "subscription"),
            ("success_url", self.config.success_url.as_str()),
            ("cancel_url", self.config.cancel_url.as_str()),
            ("line_items[0][price]", self.config.price_id.as_str()),
            ("line_items[0][quantity]", "1"),
            ("subscription_data[trial_period_days]", trial_days.as_str()),
            ("subscription_data[metadata][user_id]", user_ref),
            ("metadata[user_id]", user_ref),
        ];

        let session: StripeCheckoutSession = self
            .stripe_request(reqwest::Method::POST, "/checkout/sessions", Some(&form))
            .await?;

        Ok(CheckoutSession {
            session_id: session.id,
            url: session.url.unwrap_or_default(),
        })
    }

    #[instrument(skip(self))]
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, BillingError> {
        debug!(subscription_id = %subscription_id, "Getting Stripe subscription");

        let sub: StripeSubscription = self
            .stripe_request(
                reqwest::Method::GET,
                &format!("/subscriptions/{subscription_id}"),
                None,
            )
            .await?;

        sub.try_into()
    }

    #[instrument(skip(self))]
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), BillingError> {
        debug!(subscription_id = %subscription_id, "Canceling subscription");

        let _: StripeSubscription = self
            .stripe_request(
                reqwest::Method::DELETE,
                &format!("/subscriptions/{subscription_id}"),
                None,
            )
            .await?;

        Ok(())
    }
}

/// Convert a Stripe Unix timestamp to a UTC datetime
pub(crate) fn unix_ts(secs: i64) -> Result<DateTime<Utc>, BillingError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| BillingError::WebhookError(format!("invalid timestamp: {secs}")))
}

// Stripe API response types

/// Stripe customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeCustomer {
    /// Customer ID
    pub id: String,
    /// Customer email
    pub email: Option<String>,
    /// Whether the customer is deleted
    #[serde(default)]
    pub deleted: bool,
}

/// Stripe subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeSubscription {
    /// Subscription ID
    pub id: String,
    /// Customer ID
    pub customer: String,
    /// Subscription status
    pub status: String,
    /// Trial end (Unix timestamp)
    pub trial_end: Option<i64>,
    /// Current period start (Unix timestamp)
    pub current_period_start: i64,
    /// Current period end (Unix timestamp)
    pub current_period_end: i64,
    /// Whether subscription cancels at period end
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

impl TryFrom<StripeSubscription> for ProviderSubscription {
    type Error = BillingError;

    fn try_from(sub: StripeSubscription) -> Result<Self, Self::Error> {
        Ok(ProviderSubscription {
            id: sub.id,
            customer_id: sub.customer,
            status: sub.status,
            trial_end: sub.trial_end.map(unix_ts).transpose()?,
            current_period_start: unix_ts(sub.current_period_start)?,
            current_period_end: unix_ts(sub.current_period_end)?,
        })
    }
}

/// Stripe checkout session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeCheckoutSession {
    /// Session ID
    pub id: String,
    /// Checkout URL
    pub url: Option<String>,
    /// Customer ID
    pub customer: Option<String>,
    /// Subscription ID (after completion)
    pub subscription: Option<String>,
}
