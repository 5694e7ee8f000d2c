//! Stripe webhook verification and decoding
//!
//! Signature verification always runs before any decoding or state
//! mutation. Decoding produces a tagged union with one variant per consumed
//! event type, required fields validated here at the boundary; any other
//! event type becomes an explicit [`EventKind::Ignored`] so it can be
//! acknowledged without touching business logic.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};

use crate::error::BillingError;
use crate::stripe::unix_ts;

/// Verified and decoded webhook event
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Provider event ID
    pub id: String,
    /// When the event was created (Unix timestamp)
    pub created: i64,
    /// Decoded event body
    pub kind: EventKind,
}

/// Tagged union of the event types the lifecycle engine consumes
#[derive(Debug, Clone)]
pub enum EventKind {
    /// `checkout.session.completed`
    CheckoutCompleted(CheckoutCompletedData),
    /// `customer.subscription.updated`
    SubscriptionUpdated(SubscriptionEventData),
    /// `customer.subscription.deleted`
    SubscriptionDeleted(SubscriptionEventData),
    /// `invoice.payment_succeeded`
    InvoicePaymentSucceeded(InvoiceEventData),
    /// `invoice.payment_failed`
    InvoicePaymentFailed(InvoiceEventData),
    /// Any other event type; acknowledged and dropped
    Ignored {
        /// The raw event type string
        event_type: String,
    },
}

/// Checkout session completion payload
#[derive(Debug, Clone)]
pub struct CheckoutCompletedData {
    /// Checkout session ID
    pub session_id: String,
    /// Provider customer ID, if the session carries one
    pub customer_id: Option<String>,
    /// Provider subscription ID; absent for non-subscription checkouts
    pub subscription_id: Option<String>,
    /// Internal user reference from the session metadata
    pub user_ref: Option<String>,
}

/// Subscription create/update/delete payload
#[derive(Debug, Clone)]
pub struct SubscriptionEventData {
    /// Provider subscription ID
    pub subscription_id: String,
    /// Provider customer ID
    pub customer_id: String,
    /// Provider status string
    pub status: String,
    /// Trial end, if a trial applies
    pub trial_end: Option<DateTime<Utc>>,
    /// Current period start
    pub period_start: DateTime<Utc>,
    /// Current period end
    pub period_end: DateTime<Utc>,
}

/// Invoice payment payload
#[derive(Debug, Clone)]
pub struct InvoiceEventData {
    /// Provider invoice ID
    pub invoice_id: String,
    /// Provider customer ID
    pub customer_id: String,
    /// Provider subscription ID; absent for one-off invoices
    pub subscription_id: Option<String>,
    /// Invoice period start
    pub period_start: DateTime<Utc>,
    /// Invoice period end
    pub period_end: DateTime<Utc>,
}

/// Webhook handler for verifying and decoding Stripe events
#[derive(Clone)]
pub struct WebhookHandler {
    webhook_secret: String,
}

impl WebhookHandler {
    /// Create a new webhook handler
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Verify the signature and decode the payload
    #[instrument(skip(self, payload, signature))]
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, BillingError> {
        self.verify_signature(payload, signature)?;

        let raw_event: RawStripeEvent = serde_json::from_slice(payload)
            .map_err(|e| BillingError::WebhookError(e.to_string()))?;

        debug!(event_id = %raw_event.id, event_type = %raw_event.event_type, "Parsed webhook event");

        let kind = decode_event(&raw_event.event_type, raw_event.data.object)?;

        Ok(WebhookEvent {
            id: raw_event.id,
            created: raw_event.created,
            kind,
        })
    }

    /// Verify Stripe webhook signature
    fn verify_signature(&self, payload: &[u8], signature: &str) -> Result<(), BillingError> {
        // Parse signature header: t=timestamp,v1=signature
        let mut timestamp: Option<&str> = None;
        let mut sig_v1: Option<&str> = None;

        for part in signature.split(',') {
            if let Some((key, value)) = part.split_once('=') {
                match key {
                    "t" => timestamp = Some(value),
                    "v1" => sig_v1 = Some(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            warn!("Missing timestamp in webhook signature");
            BillingError::WebhookError("Missing timestamp".to_string())
        })?;

        let sig_v1 = sig_v1.ok_or_else(|| {
            warn!("Missing v1 signature in webhook signature");
            BillingError::WebhookError("Missing signature".to_string())
        })?;

        // Build signed payload
        let signed_payload = format!(
            "{}.{}",
            timestamp,
            std::str::from_utf8(payload)
                .map_err(|_| BillingError::WebhookError("Invalid payload encoding".to_string()))?
        );

        // Compute expected signature
        let mut mac = Hmac::<Sha256>::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| BillingError::Internal("HMAC error".to_string()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Compare signatures (constant-time)
        if !constant_time_eq(sig_v1.as_bytes(), expected.as_bytes()) {
            error!("Webhook signature verification failed");
            return Err(BillingError::WebhookError(
                "Signature verification failed".to_string(),
            ));
        }

        // Check timestamp freshness (within 5 minutes)
        let ts: i64 = timestamp
            .parse()
            .map_err(|_| BillingError::WebhookError("Invalid timestamp format".to_string()))?;
        let now = Utc::now().timestamp();
        if (now - ts).abs() > 300 {
            warn!(timestamp = ts, now = now, "Webhook timestamp too old");
            return Err(BillingError::WebhookError("Timestamp too old".to_string()));
        }

        Ok(())
    }
}

/// Decode the event object based on its type string
fn decode_event(event_type: &str, object: serde_json::Value) -> Result<EventKind, BillingError> {
    match event_type {
        "checkout.session.completed" => {
            let session: RawCheckoutSession = serde_json::from_value(object)
                .map_err(|e| BillingError::WebhookError(e.to_string()))?;
            let user_ref = session
                .metadata
                .as_ref()
                .and_then(|m| m.get("user_id").cloned());
            Ok(EventKind::CheckoutCompleted(CheckoutCompletedData {
                session_id: session.id,
                customer_id: session.customer,
                subscription_id: session.subscription,
                user_ref,
            }))
        }
        "customer.subscription.updated" | "customer.subscription.deleted" => {
            let sub: RawSubscription = serde_json::from_value(object)
                .map_err(|e| BillingError::WebhookError(e.to_string()))?;
            let data = SubscriptionEventData {
                subscription_id: sub.id,
                customer_id: sub.customer,
                status: sub.status,
                trial_end: sub.trial_end.map(unix_ts).transpose()?,
                period_start: unix_ts(sub.current_period_start)?,
                period_end: unix_ts(sub.current_period_end)?,
            };
            if event_type == "customer.subscription.deleted" {
                Ok(EventKind::SubscriptionDeleted(data))
            } else {
                Ok(EventKind::SubscriptionUpdated(data))
            }
        }
        "invoice.payment_succeeded" | "invoice.payment_failed" => {
            let inv: RawInvoice = serde_json::from_value(object)
                .map_err(|e| BillingError::WebhookError(e.to_string()))?;
            let data = InvoiceEventData {
                invoice_id: inv.id,
                customer_id: inv.customer,
                subscription_id: inv.subscription,
                period_start: unix_ts(inv.period_start)?,
                period_end: unix_ts(inv.period_end)?,
            };
            if event_type == "invoice.payment_failed" {
                Ok(EventKind::InvoicePaymentFailed(data))
            } else {
                Ok(EventKind::InvoicePaymentSucceeded(data))
            }
        }
        other => {
            info!(event_type = %other, "Ignoring unhandled webhook event type");
            Ok(EventKind::Ignored {
                event_type: other.to_string(),
            })
        }
    }
}

/// Constant-time comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

// Raw Stripe event shapes for decoding

#[derive(Debug, Deserialize)]
struct RawStripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
    created: i64,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawCheckoutSession {
    id: String,
    customer: Option<String>,
    subscription: Option<String>,
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct RawSubscription {
    id: String,
    customer: String,
    status: String,
    trial_end: Option<i64>,
    current_period_start: i64,
    current_period_end: i64,
}

#[derive(Debug, Deserialize)]
struct RawInvoice {
    id: String,
    customer: String,
    subscription: Option<String>,
    period_start: i64,
    period_end: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let signed = format!("{}.{}", timestamp, std::str::from_utf8(payload).unwrap());
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed.as_bytes());
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    fn subscription_payload(event_type: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": event_type,
            "created": Utc::now().timestamp(),
            "data": {
                "object": {
                    "id": "sub_1",
                    "customer": "cus_1",
                    "status": "active",
                    "trial_end": null,
                    "current_period_start": Utc::now().timestamp(),
                    "current_period_end": Utc::now().timestamp() + 30 * 24 * 60 * 60
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn valid_signature_and_decode() {
        let secret = "whsec_test";
        let handler = WebhookHandler::new(secret);
        let payload = subscription_payload("customer.subscription.updated");
        let sig = sign(&payload, secret, Utc::now().timestamp());

        let event = handler.verify_and_parse(&payload, &sig).unwrap();
        assert_eq!(event.id, "evt_1");
        match event.kind {
            EventKind::SubscriptionUpdated(data) => {
                assert_eq!(data.customer_id, "cus_1");
                assert_eq!(data.status, "active");
            }
            other => panic!("unexpected event kind: {other:?}"),
        }
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let handler = WebhookHandler::new("whsec_right");
        let payload = subscription_payload("customer.subscription.updated");
        let sig = sign(&payload, "whsec_wrong", Utc::now().timestamp());

        assert!(handler.verify_and_parse(&payload, &sig).is_err());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let secret = "whsec_test";
        let handler = WebhookHandler::new(secret);
        let payload = subscription_payload("customer.subscription.updated");
        let sig = sign(&payload, secret, Utc::now().timestamp() - 600);

        assert!(handler.verify_and_parse(&payload, &sig).is_err());
    }

    #[test]
    fn malformed_signature_header_is_rejected() {
        let handler = WebhookHandler::new("whsec_test");
        let payload = subscription_payload("customer.subscription.updated");

        assert!(handler.verify_and_parse(&payload, "v1=deadbeef").is_err());
        assert!(handler.verify_and_parse(&payload, "t=123").is_err());
        assert!(handler.verify_and_parse(&payload, "").is_err());
    }

    #[test]
    fn unknown_event_type_decodes_to_ignored() {
        let secret = "whsec_test";
        let handler = WebhookHandler::new(secret);
        let payload = serde_json::to_vec(&json!({
            "id": "evt_2",
            "type": "customer.created",
            "created": Utc::now().timestamp(),
            "data": { "object": { "id": "cus_1" } }
        }))
        .unwrap();
        let sig = sign(&payload, secret, Utc::now().timestamp());

        let event = handler.verify_and_parse(&payload, &sig).unwrap();
        match event.kind {
            EventKind::Ignored { event_type } => assert_eq!(event_type, "customer.created"),
            other => panic!("unexpected event kind: {other:?}"),
        }
    }

    #[test]
    fn checkout_session_metadata_user_ref() {
        let secret = "whsec_test";
        let handler = WebhookHandler::new(secret);
        let payload = serde_json::to_vec(&json!({
            "id": "evt_3",
            "type": "checkout.session.completed",
            "created": Utc::now().timestamp(),
            "data": {
                "object": {
                    "id": "cs_1",
                    "customer": "cus_1",
                    "subscription": "sub_1",
                    "metadata": { "user_id": "2c2a3f3e-5b5f-4e2a-9f63-0d6d9a6f3b10" }
                }
            }
        }))
        .unwrap();
        let sig = sign(&payload, secret, Utc::now().timestamp());

        let event = handler.verify_and_parse(&payload, &sig).unwrap();
        match event.kind {
            EventKind::CheckoutCompleted(data) => {
                assert_eq!(data.user_ref.as_deref(), Some("2c2a3f3e-5b5f-4e2a-9f63-0d6d9a6f3b10"));
                assert_eq!(data.subscription_id.as_deref(), Some("sub_1"));
            }
            other => panic!("unexpected event kind: {other:?}"),
        }
    }

    #[test]
    fn missing_required_field_fails_decode() {
        let secret = "whsec_test";
        let handler = WebhookHandler::new(secret);
        // Subscription object with no customer field
        let payload = serde_json::to_vec(&json!({
            "id": "evt_4",
            "type": "customer.subscription.updated",
            "created": Utc::now().timestamp(),
            "data": {
                "object": {
                    "id": "sub_1",
                    "status": "active",
                    "current_period_start": Utc::now().timestamp(),
                    "current_period_end": Utc::now().timestamp() + 60
                }
            }
        }))
        .unwrap();
        let sig = sign(&payload, secret, Utc::now().timestamp());

        assert!(handler.verify_and_parse(&payload, &sig).is_err());
    }
}
