//! Configuration for the Billing API service.

use recall_billing_core::BillingConfig;
use recall_types::{PlanLimits, TierLimits};
use std::time::Duration;

/// Billing API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Billing core configuration
    pub billing: BillingConfig,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Database
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        // Server port
        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8081".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        // Stripe configuration
        let stripe_secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| ConfigError::Missing("STRIPE_SECRET_KEY"))?;

        let stripe_webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| ConfigError::Missing("STRIPE_WEBHOOK_SECRET"))?;

        let stripe_price_id = std::env::var("STRIPE_PRICE_ID")
            .map_err(|_| ConfigError::Missing("STRIPE_PRICE_ID"))?;

        let trial_days = env_parse("PRO_TRIAL_DAYS", 7u32)?;

        // Checkout redirect targets
        let success_url = std::env::var("BILLING_SUCCESS_URL")
            .unwrap_or_else(|_| "https://app.example.com/subscription/success".to_string());

        let cancel_url = std::env::var("BILLING_CANCEL_URL")
            .unwrap_or_else(|_| "https://app.example.com/subscription/cancel".to_string());

        // Tier limits, operator-tunable without a code change
        let limits = PlanLimits {
            free: TierLimits {
                uploads_per_week: env_parse("FREE_UPLOADS_PER_WEEK", 1i64)?,
                quizzes_per_material: env_parse("FREE_QUIZZES_PER_MATERIAL", 1i64)?,
                chat_enabled: false,
            },
            pro: TierLimits {
                uploads_per_week: env_parse("PRO_UPLOADS_PER_WEEK", 20i64)?,
                quizzes_per_material: env_parse("PRO_QUIZZES_PER_MATERIAL", 10i64)?,
                chat_enabled: true,
            },
        };

        // Request timeout
        let request_timeout_secs = env_parse("REQUEST_TIMEOUT_SECS", 30u64)?;

        // Metrics
        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        let billing =
            BillingConfig::new(&stripe_secret_key, &stripe_webhook_secret, &stripe_price_id)
                .with_trial_days(trial_days)
                .with_urls(&success_url, &cancel_url)
                .with_limits(limits);

        Ok(Self {
            http_port,
            database_url,
            billing,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
