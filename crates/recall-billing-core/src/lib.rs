//! Recall Billing Core - Subscription and entitlement business logic
//!
//! Core billing functionality: the subscription lifecycle state machine fed
//! by Stripe webhooks, the entitlement gate consulted by rate-limited
//! operations, usage counters with lazy weekly reset, and the Stripe
//! provider integration.
//!
//! # Example
//!
//! ```rust,ignore
//! use recall_billing_core::{BillingConfig, BillingService, StripeProvider};
//! use recall_db::Repositories;
//!
//! let config = BillingConfig::new("sk_test_...", "whsec_...", "price_...");
//! let provider = StripeProvider::new(config.clone());
//! let billing = BillingService::new(
//!     Arc::new(repos.subscriptions),
//!     Arc::new(repos.materials),
//!     Arc::new(provider),
//!     config,
//! );
//!
//! // Synchronous client path
//! let decision = billing.can_upload(user_id).await?;
//! if decision.allowed {
//!     // ... perform the upload, then:
//!     billing.record_upload(user_id).await?;
//! }
//!
//! // Webhook path
//! billing.process_webhook(&body, signature).await?;
//! ```

pub mod clock;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod lifecycle;
pub mod provider;
pub mod service;
pub mod stripe;
pub mod usage;
pub mod webhook;

pub use clock::{Clock, SystemClock};
pub use config::BillingConfig;
pub use entitlement::EntitlementGate;
pub use error::BillingError;
pub use lifecycle::LifecycleEngine;
pub use provider::{PaymentProvider, ProviderCustomer, ProviderSubscription};
pub use service::BillingService;
pub use stripe::StripeProvider;
pub use usage::UsageCounters;
pub use webhook::{EventKind, WebhookEvent, WebhookHandler};

// Re-export checkout types from recall-types for convenience
pub use recall_types::{CheckoutSession, Decision, SubscriptionOverview};
