//! Billing errors

use thiserror::Error;

/// Billing errors
#[derive(Error, Debug)]
pub enum BillingError {
    /// Checkout requested while a pro-state subscription already exists
    #[error("an active subscription already exists")]
    AlreadySubscribed,

    /// Cancel requested with no paid subscription in place
    #[error("no active subscription to cancel")]
    NoActiveSubscription,

    /// Payment provider error
    #[error("provider error: {0}")]
    ProviderError(String),

    /// Webhook verification or decoding error
    #[error("webhook error: {0}")]
    WebhookError(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] recall_db::DbError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Check if this is a caller mistake rather than a system failure
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::AlreadySubscribed | Self::NoActiveSubscription)
    }

    /// Check if this is a provider-side error
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::ProviderError(_))
    }
}
