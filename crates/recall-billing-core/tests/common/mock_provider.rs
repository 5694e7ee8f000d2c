//! Fake payment provider for testing

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use recall_billing_core::{BillingError, PaymentProvider, ProviderCustomer, ProviderSubscription};
use recall_types::CheckoutSession;

/// In-memory payment provider with scriptable failures
#[derive(Default)]
pub struct MockProvider {
    /// Subscriptions returned by `get_subscription`, keyed by ID
    pub subscriptions: DashMap<String, ProviderSubscription>,
    /// Subscription IDs that cancel was called with
    pub cancel_calls: Mutex<Vec<String>>,
    /// When set, `cancel_subscription` fails
    pub fail_cancel: AtomicBool,
    customers_created: AtomicUsize,
    checkouts_created: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscription(self, sub: ProviderSubscription) -> Self {
        self.subscriptions.insert(sub.id.clone(), sub);
        self
    }

    pub fn customers_created(&self) -> usize {
        self.customers_created.load(Ordering::SeqCst)
    }

    pub fn checkouts_created(&self) -> usize {
        self.checkouts_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn create_customer(
        &self,
        _email: &str,
        user_ref: &str,
    ) -> Result<ProviderCustomer, BillingError> {
        let n = self.customers_created.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderCustomer {
            id: format!("cus_mock_{n}_{user_ref}"),
            email: None,
        })
    }

    async fn create_checkout_session(
        &self,
        customer_id: &str,
        _user_ref: &str,
    ) -> Result<CheckoutSession, BillingError> {
        let n = self.checkouts_created.fetch_add(1, Ordering::SeqCst);
        Ok(CheckoutSession {
            session_id: format!("cs_mock_{n}"),
            url: format!("https://checkout.example.com/{customer_id}/{n}"),
        })
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, BillingError> {
        self.subscriptions
            .get(subscription_id)
            .map(|s| s.value().clone())
            .ok_or_else(|| BillingError::ProviderError("no such subscription".to_string()))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), BillingError> {
        self.cancel_calls
            .lock()
            .unwrap()
            .push(subscription_id.to_string());

        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(BillingError::ProviderError(
                "simulated cancel failure".to_string(),
            ));
        }
        Ok(())
    }
}
