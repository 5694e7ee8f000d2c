//! Subscription handlers

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use recall_types::{SubscriptionOverview, UserId};

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::record_op_duration;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub user_id: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/billing/subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<SubscriptionOverview>> {
    let start = Instant::now();
    let user_id = UserId::parse(&query.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;

    let overview = state.billing.overview(user_id.0).await?;

    record_op_duration("get_subscription", start, true);
    Ok(Json(overview))
}

/// POST /api/v1/billing/checkout
///
/// Guarded: a user already in a pro state gets a 400 before any provider
/// call is made.
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(req): Json<CreateCheckoutRequest>,
) -> ApiResult<Json<CheckoutResponse>> {
    let start = Instant::now();
    let user_id = UserId::parse(&req.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;

    let session = state.billing.create_checkout(user_id.0, &req.email).await?;

    metrics::counter!("billing_checkouts_created_total").increment(1);
    record_op_duration("create_checkout", start, true);

    tracing::info!(user_id = %user_id, "Checkout session created");

    Ok(Json(CheckoutResponse {
        checkout_url: session.url,
        session_id: session.session_id,
    }))
}

/// POST /api/v1/billing/cancel
///
/// Cancels immediately: best-effort provider cancel, local downgrade to
/// free regardless. Responds with the refreshed subscription overview.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Json(req): Json<CancelRequest>,
) -> ApiResult<Json<SubscriptionOverview>> {
    let start = Instant::now();
    let user_id = UserId::parse(&req.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;

    state.billing.cancel(user_id.0).await?;

    let overview = state.billing.overview(user_id.0).await?;

    metrics::counter!("billing_subscriptions_canceled_total").increment(1);
    record_op_duration("cancel_subscription", start, true);

    tracing::info!(user_id = %user_id, "Subscription canceled");
    Ok(Json(overview))
}
