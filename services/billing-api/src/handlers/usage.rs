//! Usage recording handlers
//!
//! Called by the capability services after the guarded action has durably
//! succeeded, never before; entitlement checks stay read-only.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::instrument;

use recall_types::{MaterialId, UserId};

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::record_op_duration;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RecordUploadRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordQuizRequest {
    pub material_id: String,
}

#[derive(Debug, Serialize)]
pub struct RecordUsageResponse {
    pub success: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/billing/usage/upload
#[instrument(skip(state, req), fields(user_id = %req.user_id))]
pub async fn record_upload(
    State(state): State<AppState>,
    Json(req): Json<RecordUploadRequest>,
) -> ApiResult<Json<RecordUsageResponse>> {
    let start = Instant::now();
    let user_id = UserId::parse(&req.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;

    state.billing.record_upload(user_id.0).await?;

    metrics::counter!("billing_usage_recorded_total", "metric" => "uploads").increment(1);
    record_op_duration("record_upload", start, true);

    Ok(Json(RecordUsageResponse { success: true }))
}

/// POST /api/v1/billing/usage/quiz
#[instrument(skip(state, req), fields(material_id = %req.material_id))]
pub async fn record_quiz(
    State(state): State<AppState>,
    Json(req): Json<RecordQuizRequest>,
) -> ApiResult<Json<RecordUsageResponse>> {
    let start = Instant::now();
    let material_id = MaterialId::parse(&req.material_id)
        .map_err(|_| ApiError::BadRequest("Invalid material_id".to_string()))?;

    state.billing.record_quiz(material_id.0).await?;

    metrics::counter!("billing_usage_recorded_total", "metric" => "quizzes").increment(1);
    record_op_duration("record_quiz", start, true);

    Ok(Json(RecordUsageResponse { success: true }))
}
