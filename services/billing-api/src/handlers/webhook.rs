//! Stripe webhook handler

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use std::time::Instant;

use recall_billing_core::BillingError;

use crate::state::AppState;

/// POST /webhooks/stripe
///
/// Raw-body endpoint: signature verification runs before any decoding or
/// state mutation. Verification and decode failures are rejected;
/// structurally valid events that cannot be reconciled are still
/// acknowledged with 200 so Stripe does not redeliver them forever.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let start = Instant::now();

    // Extract Stripe signature header
    let Some(sig_header) = headers.get("stripe-signature") else {
        tracing::warn!("Missing Stripe-Signature header");
        return StatusCode::UNAUTHORIZED;
    };

    let Ok(signature) = sig_header.to_str() else {
        tracing::warn!("Invalid Stripe-Signature header encoding");
        return StatusCode::BAD_REQUEST;
    };

    match state.billing.process_webhook(&body, signature).await {
        Ok(()) => {
            metrics::counter!("billing_webhooks_processed_total", "status" => "success")
                .increment(1);
            metrics::histogram!(
                "billing_operation_duration_seconds",
                "operation" => "process_webhook"
            )
            .record(start.elapsed().as_secs_f64());

            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(error = ?e, "Webhook processing failed");
            metrics::counter!("billing_webhooks_processed_total", "status" => "error").increment(1);

            match e {
                BillingError::WebhookError(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }
}
