//! Application state for the Billing API service.

use recall_billing_core::{BillingService, StripeProvider};
use recall_db::pg::{PgMaterialUsageRepository, PgSubscriptionRepository};
use recall_db::DbPool;
use std::sync::Arc;

use crate::config::Config;

/// Concrete billing service wiring used by this deployment
pub type Billing =
    BillingService<PgSubscriptionRepository, PgMaterialUsageRepository, StripeProvider>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Billing service (lifecycle, entitlements, usage, webhooks)
    pub billing: Arc<Billing>,
    /// Database pool (readiness checks)
    pub pool: DbPool,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(billing: Billing, pool: DbPool, config: Config) -> Self {
        Self {
            billing: Arc::new(billing),
            pool,
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }

    /// Upgrade reference echoed in entitlement denials
    pub fn upgrade_url(&self) -> &str {
        &self.config.billing.upgrade_url
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
