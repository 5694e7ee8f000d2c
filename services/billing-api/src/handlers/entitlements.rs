//! Entitlement check handlers
//!
//! The capability services (material upload, quiz generation, chat) call
//! these before performing the action. An allowed check returns the
//! decision; a denied check is a 403 carrying the structured
//! `LimitExceeded` payload, so the end client always sees the limit, the
//! tier, and how to upgrade.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::time::Instant;

use recall_types::{Decision, DenialCode, LimitExceeded, MaterialId, Tier, UserId};

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::record_op_duration;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EntitlementQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct QuizEntitlementQuery {
    pub user_id: String,
    pub material_id: String,
}

fn denial(
    state: &AppState,
    code: DenialCode,
    detail: impl Into<String>,
    limit: i64,
    tier: Tier,
) -> ApiError {
    metrics::counter!("billing_entitlement_denials_total", "code" => code.as_str()).increment(1);
    ApiError::Denied(LimitExceeded {
        detail: detail.into(),
        code,
        limit,
        tier,
        upgrade_url: state.upgrade_url().to_string(),
    })
}

/// GET /api/v1/billing/entitlements/upload
pub async fn check_upload(
    State(state): State<AppState>,
    Query(query): Query<EntitlementQuery>,
) -> ApiResult<Json<Decision>> {
    let start = Instant::now();
    let user_id = UserId::parse(&query.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;

    let decision = state.billing.can_upload(user_id.0).await?;
    record_op_duration("check_upload", start, true);

    if !decision.allowed {
        let overview = state.billing.overview(user_id.0).await?;
        return Err(denial(
            &state,
            DenialCode::UploadLimitReached,
            format!(
                "Weekly upload limit reached ({} of {})",
                decision.current, decision.limit
            ),
            decision.limit,
            overview.tier,
        ));
    }

    Ok(Json(decision))
}

/// GET /api/v1/billing/entitlements/quiz
pub async fn check_quiz(
    State(state): State<AppState>,
    Query(query): Query<QuizEntitlementQuery>,
) -> ApiResult<Json<Decision>> {
    let start = Instant::now();
    let user_id = UserId::parse(&query.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;
    let material_id = MaterialId::parse(&query.material_id)
        .map_err(|_| ApiError::BadRequest("Invalid material_id".to_string()))?;

    let decision = state
        .billing
        .can_create_quiz(user_id.0, material_id.0)
        .await?;
    record_op_duration("check_quiz", start, true);

    if !decision.allowed {
        let overview = state.billing.overview(user_id.0).await?;
        return Err(denial(
            &state,
            DenialCode::QuizLimitReached,
            format!(
                "Quiz limit for this material reached ({} of {})",
                decision.current, decision.limit
            ),
            decision.limit,
            overview.tier,
        ));
    }

    Ok(Json(decision))
}

/// GET /api/v1/billing/entitlements/chat
pub async fn check_chat(
    State(state): State<AppState>,
    Query(query): Query<EntitlementQuery>,
) -> ApiResult<Json<Decision>> {
    let start = Instant::now();
    let user_id = UserId::parse(&query.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?;

    let allowed = state.billing.can_use_chat(user_id.0).await?;
    record_op_duration("check_chat", start, true);

    if !allowed {
        return Err(denial(
            &state,
            DenialCode::ChatAccessDenied,
            "Chat is only available for Pro users",
            0,
            Tier::Free,
        ));
    }

    Ok(Json(Decision {
        allowed: true,
        current: 0,
        limit: 0,
    }))
}
