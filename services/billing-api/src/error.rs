//! Error types for the Billing API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use recall_billing_core::BillingError;
use recall_types::LimitExceeded;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Entitlement denial: 403 with the full structured payload, never a
    /// bare boolean
    #[error("Forbidden: {}", .0.detail)]
    Denied(LimitExceeded),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error")]
    Database(#[from] recall_db::DbError),

    #[error("Billing error")]
    Billing(#[from] BillingError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Denied(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Billing(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Billing(BillingError::WebhookError(_)) => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::Database(_) | Self::Billing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Denied(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Billing(BillingError::AlreadySubscribed) => "ALREADY_SUBSCRIBED",
            Self::Billing(BillingError::NoActiveSubscription) => "NO_ACTIVE_SUBSCRIPTION",
            Self::Billing(BillingError::WebhookError(_)) => "WEBHOOK_ERROR",
            Self::Internal(_) | Self::Database(_) | Self::Billing(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            // Denials carry their own structured body
            Self::Denied(payload) => (status, Json(payload)).into_response(),
            other => {
                // Log internal errors
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = ?other, "Internal API error");
                }

                let body = ErrorResponse {
                    error: ErrorDetail {
                        code: other.error_code().to_string(),
                        message: other.to_string(),
                    },
                };

                (status, Json(body)).into_response()
            }
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
