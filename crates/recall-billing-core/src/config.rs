//! Billing configuration

use recall_types::{PlanLimits, TierLimits};

/// Billing service configuration.
///
/// An explicit value object passed into the engine and gate at
/// construction; limits and the price id are never read from ambient
/// global state, so tests can inject arbitrary values.
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Price ID for the single pro plan
    pub price_id: String,
    /// Trial length in days granted at checkout
    pub trial_days: u32,
    /// Success redirect target for checkout
    pub success_url: String,
    /// Cancel redirect target for checkout
    pub cancel_url: String,
    /// Relative URL clients use to start an upgrade; echoed in denials
    pub upgrade_url: String,
    /// Per-tier usage limits
    pub limits: PlanLimits,
}

impl BillingConfig {
    /// Create a new billing config with default limits and URLs
    pub fn new(
        stripe_secret_key: impl Into<String>,
        stripe_webhook_secret: impl Into<String>,
        price_id: impl Into<String>,
    ) -> Self {
        Self {
            stripe_secret_key: stripe_secret_key.into(),
            stripe_webhook_secret: stripe_webhook_secret.into(),
            price_id: price_id.into(),
            trial_days: 7,
            success_url: "https://app.example.com/subscription/success".to_string(),
            cancel_url: "https://app.example.com/subscription/cancel".to_string(),
            upgrade_url: "/api/v1/billing/checkout".to_string(),
            limits: Self::default_limits(),
        }
    }

    /// Set the trial length
    pub fn with_trial_days(mut self, days: u32) -> Self {
        self.trial_days = days;
        self
    }

    /// Set checkout redirect URLs
    pub fn with_urls(
        mut self,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        self.success_url = success_url.into();
        self.cancel_url = cancel_url.into();
        self
    }

    /// Set the per-tier limits
    pub fn with_limits(mut self, limits: PlanLimits) -> Self {
        self.limits = limits;
        self
    }

    fn default_limits() -> PlanLimits {
        PlanLimits {
            free: TierLimits {
                uploads_per_week: 1,
                quizzes_per_material: 1,
                chat_enabled: false,
            },
            pro: TierLimits {
                uploads_per_week: 20,
                quizzes_per_material: 10,
                chat_enabled: true,
            },
        }
    }
}
