//! Lifecycle engine tests
//!
//! Exercise the state machine against in-memory stores and a fake
//! provider: event application, idempotent replays, unreconcilable-event
//! handling, and the guarded local actions.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};
use uuid::Uuid;

use recall_billing_core::webhook::{
    CheckoutCompletedData, EventKind, InvoiceEventData, SubscriptionEventData, WebhookEvent,
};
use recall_billing_core::{BillingError, Clock, LifecycleEngine, ProviderSubscription};
use recall_types::SubscriptionStatus;

use common::mock_provider::MockProvider;
use common::mock_repos::MockSubscriptionStore;
use common::ManualClock;

struct Fixture {
    store: MockSubscriptionStore,
    provider: Arc<MockProvider>,
    clock: Arc<ManualClock>,
    engine: LifecycleEngine<MockSubscriptionStore, MockProvider>,
}

fn fixture_with_provider(provider: MockProvider) -> Fixture {
    let store = MockSubscriptionStore::new();
    let provider = Arc::new(provider);
    let clock = Arc::new(ManualClock::new());
    let engine = LifecycleEngine::new(
        Arc::new(store.clone()),
        provider.clone(),
        clock.clone(),
    );
    Fixture {
        store,
        provider,
        clock,
        engine,
    }
}

fn fixture() -> Fixture {
    fixture_with_provider(MockProvider::new())
}

fn event(kind: EventKind) -> WebhookEvent {
    WebhookEvent {
        id: format!("evt_{}", Uuid::new_v4()),
        created: Utc::now().timestamp(),
        kind,
    }
}

fn checkout_completed(user_id: Option<Uuid>, subscription_id: Option<&str>) -> WebhookEvent {
    event(EventKind::CheckoutCompleted(CheckoutCompletedData {
        session_id: "cs_1".to_string(),
        customer_id: Some("cus_1".to_string()),
        subscription_id: subscription_id.map(str::to_string),
        user_ref: user_id.map(|u| u.to_string()),
    }))
}

fn subscription_event(customer_id: &str, status: &str) -> SubscriptionEventData {
    let now = Utc::now();
    SubscriptionEventData {
        subscription_id: "sub_1".to_string(),
        customer_id: customer_id.to_string(),
        status: status.to_string(),
        trial_end: None,
        period_start: now,
        period_end: now + Duration::days(30),
    }
}

fn invoice_event(customer_id: &str, subscription_id: Option<&str>) -> InvoiceEventData {
    let now = Utc::now();
    InvoiceEventData {
        invoice_id: "in_1".to_string(),
        customer_id: customer_id.to_string(),
        subscription_id: subscription_id.map(str::to_string),
        period_start: now,
        period_end: now + Duration::days(30),
    }
}

/// Seed a pro-state row wired to cus_1/sub_1
fn seed_pro_row(fix: &Fixture, user_id: Uuid, status: SubscriptionStatus) {
    let mut row = MockSubscriptionStore::seeded_row(user_id, fix.clock.now());
    row.status = status.as_str().to_string();
    row.stripe_customer_id = Some("cus_1".to_string());
    row.stripe_subscription_id = Some("sub_1".to_string());
    row.current_period_start = Some(fix.clock.now());
    row.current_period_end = Some(fix.clock.now() + Duration::days(30));
    fix.store.insert_row(row);
}

fn trialing_provider_subscription(trial_days: i64) -> ProviderSubscription {
    let now = Utc::now();
    ProviderSubscription {
        id: "sub_1".to_string(),
        customer_id: "cus_1".to_string(),
        status: "trialing".to_string(),
        trial_end: Some(now + Duration::days(trial_days)),
        current_period_start: now,
        current_period_end: now + Duration::days(trial_days),
    }
}

// ---------------------------------------------------------------------------
// Checkout completion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn checkout_with_trial_creates_trialing_subscription() {
    let fix = fixture_with_provider(
        MockProvider::new().with_subscription(trialing_provider_subscription(7)),
    );
    let user_id = Uuid::new_v4();

    fix.engine
        .apply(&checkout_completed(Some(user_id), Some("sub_1")))
        .await
        .unwrap();

    let row = fix.store.row_for_user(user_id).expect("row created");
    assert_eq!(row.status(), SubscriptionStatus::Trialing);
    assert_eq!(row.stripe_customer_id.as_deref(), Some("cus_1"));
    assert_eq!(row.stripe_subscription_id.as_deref(), Some("sub_1"));
    assert!(row.trial_start.is_some());
    assert!(row.trial_end.is_some());
    assert!(row.current_period_start.is_some());
    assert!(row.current_period_end.is_some());
}

#[tokio::test]
async fn checkout_without_trial_creates_active_subscription() {
    let mut sub = trialing_provider_subscription(30);
    sub.status = "active".to_string();
    sub.trial_end = None;
    let fix = fixture_with_provider(MockProvider::new().with_subscription(sub));
    let user_id = Uuid::new_v4();

    fix.engine
        .apply(&checkout_completed(Some(user_id), Some("sub_1")))
        .await
        .unwrap();

    let row = fix.store.row_for_user(user_id).expect("row created");
    assert_eq!(row.status(), SubscriptionStatus::Active);
    assert!(row.trial_start.is_none());
    assert!(row.trial_end.is_none());
}

#[tokio::test]
async fn checkout_replay_is_idempotent() {
    let fix = fixture_with_provider(
        MockProvider::new().with_subscription(trialing_provider_subscription(7)),
    );
    let user_id = Uuid::new_v4();
    let evt = checkout_completed(Some(user_id), Some("sub_1"));

    fix.engine.apply(&evt).await.unwrap();
    let first = fix.store.row_for_user(user_id).unwrap();

    fix.engine.apply(&evt).await.unwrap();
    let second = fix.store.row_for_user(user_id).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.status, second.status);
    assert_eq!(first.stripe_customer_id, second.stripe_customer_id);
    assert_eq!(first.stripe_subscription_id, second.stripe_subscription_id);
    assert_eq!(first.trial_start, second.trial_start);
    assert_eq!(first.trial_end, second.trial_end);
    assert_eq!(first.current_period_start, second.current_period_start);
    assert_eq!(first.current_period_end, second.current_period_end);
    assert_eq!(first.uploads_this_week, second.uploads_this_week);
    assert_eq!(fix.store.len(), 1);
}

#[tokio::test]
async fn checkout_without_user_ref_is_dropped() {
    let fix = fixture_with_provider(
        MockProvider::new().with_subscription(trialing_provider_subscription(7)),
    );

    fix.engine
        .apply(&checkout_completed(None, Some("sub_1")))
        .await
        .unwrap();

    assert_eq!(fix.store.len(), 0);
}

#[tokio::test]
async fn checkout_without_subscription_is_a_noop() {
    let fix = fixture();
    let user_id = Uuid::new_v4();

    fix.engine
        .apply(&checkout_completed(Some(user_id), None))
        .await
        .unwrap();

    // The lazy row may exist, but it must stay free with no provider refs
    if let Some(row) = fix.store.row_for_user(user_id) {
        assert_eq!(row.status(), SubscriptionStatus::Free);
        assert!(row.stripe_subscription_id.is_none());
    }
}

// ---------------------------------------------------------------------------
// Subscription updates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_event_maps_provider_status() {
    let fix = fixture();
    let user_id = Uuid::new_v4();
    seed_pro_row(&fix, user_id, SubscriptionStatus::Trialing);

    fix.engine
        .apply(&event(EventKind::SubscriptionUpdated(subscription_event(
            "cus_1", "past_due",
        ))))
        .await
        .unwrap();

    let row = fix.store.row_for_user(user_id).unwrap();
    assert_eq!(row.status(), SubscriptionStatus::PastDue);
}

#[tokio::test]
async fn update_event_without_trial_field_preserves_trial_start() {
    let fix = fixture();
    let user_id = Uuid::new_v4();
    let trial_start = fix.clock.now() - Duration::days(3);
    let mut row = MockSubscriptionStore::seeded_row(user_id, fix.clock.now());
    row.status = "trialing".to_string();
    row.stripe_customer_id = Some("cus_1".to_string());
    row.trial_start = Some(trial_start);
    row.trial_end = Some(fix.clock.now() + Duration::days(4));
    fix.store.insert_row(row);

    fix.engine
        .apply(&event(EventKind::SubscriptionUpdated(subscription_event(
            "cus_1", "active",
        ))))
        .await
        .unwrap();

    let row = fix.store.row_for_user(user_id).unwrap();
    assert_eq!(row.status(), SubscriptionStatus::Active);
    assert_eq!(row.trial_start, Some(trial_start));
    // trial_end is absolute from the event; the event carried none
    assert!(row.trial_end.is_none());
}

#[tokio::test]
async fn update_for_unknown_customer_is_dropped() {
    let fix = fixture();

    fix.engine
        .apply(&event(EventKind::SubscriptionUpdated(subscription_event(
            "cus_stranger",
            "active",
        ))))
        .await
        .unwrap();

    assert_eq!(fix.store.len(), 0);
}

#[tokio::test]
async fn update_replay_is_idempotent() {
    let fix = fixture();
    let user_id = Uuid::new_v4();
    seed_pro_row(&fix, user_id, SubscriptionStatus::Trialing);
    let evt = event(EventKind::SubscriptionUpdated(subscription_event(
        "cus_1", "active",
    )));

    fix.engine.apply(&evt).await.unwrap();
    let first = fix.store.row_for_user(user_id).unwrap();
    fix.engine.apply(&evt).await.unwrap();
    let second = fix.store.row_for_user(user_id).unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.trial_start, second.trial_start);
    assert_eq!(first.current_period_start, second.current_period_start);
    assert_eq!(first.current_period_end, second.current_period_end);
}

// ---------------------------------------------------------------------------
// Subscription deletion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_event_downgrades_to_free() {
    let fix = fixture();
    let user_id = Uuid::new_v4();
    seed_pro_row(&fix, user_id, SubscriptionStatus::Active);

    fix.engine
        .apply(&event(EventKind::SubscriptionDeleted(subscription_event(
            "cus_1", "canceled",
        ))))
        .await
        .unwrap();

    let row = fix.store.row_for_user(user_id).unwrap();
    assert_eq!(row.status(), SubscriptionStatus::Free);
    assert!(row.stripe_subscription_id.is_none());
    assert!(row.trial_end.is_none());
    assert!(row.current_period_start.is_none());
    assert!(row.current_period_end.is_none());
    // The customer reference survives for future checkouts
    assert_eq!(row.stripe_customer_id.as_deref(), Some("cus_1"));
}

#[tokio::test]
async fn delete_event_for_unknown_customer_creates_nothing() {
    let fix = fixture();

    fix.engine
        .apply(&event(EventKind::SubscriptionDeleted(subscription_event(
            "cus_stranger",
            "canceled",
        ))))
        .await
        .unwrap();

    assert_eq!(fix.store.len(), 0);
}

// ---------------------------------------------------------------------------
// Invoice payments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn payment_failed_then_succeeded_round_trip() {
    let fix = fixture();
    let user_id = Uuid::new_v4();
    seed_pro_row(&fix, user_id, SubscriptionStatus::Active);

    fix.engine
        .apply(&event(EventKind::InvoicePaymentFailed(invoice_event(
            "cus_1",
            Some("sub_1"),
        ))))
        .await
        .unwrap();
    assert_eq!(
        fix.store.row_for_user(user_id).unwrap().status(),
        SubscriptionStatus::PastDue
    );

    let paid = invoice_event("cus_1", Some("sub_1"));
    let expected_period_end = paid.period_end;
    fix.engine
        .apply(&event(EventKind::InvoicePaymentSucceeded(paid)))
        .await
        .unwrap();

    let row = fix.store.row_for_user(user_id).unwrap();
    assert_eq!(row.status(), SubscriptionStatus::Active);
    assert_eq!(row.current_period_end, Some(expected_period_end));
}

#[tokio::test]
async fn one_off_invoice_is_ignored() {
    let fix = fixture();
    let user_id = Uuid::new_v4();
    seed_pro_row(&fix, user_id, SubscriptionStatus::Active);

    fix.engine
        .apply(&event(EventKind::InvoicePaymentFailed(invoice_event(
            "cus_1", None,
        ))))
        .await
        .unwrap();

    assert_eq!(
        fix.store.row_for_user(user_id).unwrap().status(),
        SubscriptionStatus::Active
    );
}

#[tokio::test]
async fn invoice_for_unknown_customer_is_dropped() {
    let fix = fixture();

    fix.engine
        .apply(&event(EventKind::InvoicePaymentSucceeded(invoice_event(
            "cus_stranger",
            Some("sub_9"),
        ))))
        .await
        .unwrap();

    assert_eq!(fix.store.len(), 0);
}

// ---------------------------------------------------------------------------
// Local actions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn checkout_rejected_while_subscribed() {
    let fix = fixture();
    let user_id = Uuid::new_v4();
    seed_pro_row(&fix, user_id, SubscriptionStatus::PastDue);

    let err = fix
        .engine
        .create_checkout(user_id, "user@example.com")
        .await
        .unwrap_err();

    assert!(matches!(err, BillingError::AlreadySubscribed));
    assert_eq!(fix.provider.checkouts_created(), 0);
}

#[tokio::test]
async fn checkout_creates_customer_once() {
    let fix = fixture();
    let user_id = Uuid::new_v4();

    let session = fix
        .engine
        .create_checkout(user_id, "user@example.com")
        .await
        .unwrap();
    assert!(!session.url.is_empty());
    assert_eq!(fix.provider.customers_created(), 1);

    let row = fix.store.row_for_user(user_id).unwrap();
    let customer_id = row.stripe_customer_id.clone().expect("customer persisted");

    // Second attempt while still free reuses the stored customer
    fix.engine
        .create_checkout(user_id, "user@example.com")
        .await
        .unwrap();
    assert_eq!(fix.provider.customers_created(), 1);
    assert_eq!(
        fix.store.row_for_user(user_id).unwrap().stripe_customer_id,
        Some(customer_id)
    );
}

#[tokio::test]
async fn cancel_downgrades_even_when_provider_fails() {
    let fix = fixture();
    let user_id = Uuid::new_v4();
    seed_pro_row(&fix, user_id, SubscriptionStatus::Trialing);
    fix.provider.fail_cancel.store(true, Ordering::SeqCst);

    fix.engine.cancel(user_id).await.unwrap();

    let row = fix.store.row_for_user(user_id).unwrap();
    assert_eq!(row.status(), SubscriptionStatus::Free);
    assert!(row.stripe_subscription_id.is_none());
    assert!(row.trial_end.is_none());
    assert!(row.current_period_start.is_none());
    assert!(row.current_period_end.is_none());
    assert_eq!(
        fix.provider.cancel_calls.lock().unwrap().as_slice(),
        ["sub_1".to_string()]
    );
}

#[tokio::test]
async fn cancel_without_subscription_is_rejected() {
    let fix = fixture();
    let user_id = Uuid::new_v4();

    let err = fix.engine.cancel(user_id).await.unwrap_err();
    assert!(matches!(err, BillingError::NoActiveSubscription));
    assert!(fix.provider.cancel_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn ignored_event_is_acknowledged() {
    let fix = fixture();

    fix.engine
        .apply(&event(EventKind::Ignored {
            event_type: "customer.created".to_string(),
        }))
        .await
        .unwrap();

    assert_eq!(fix.store.len(), 0);
}
