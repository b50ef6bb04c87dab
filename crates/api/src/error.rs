//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use studyhall_billing::BillingError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication errors
    #[error("Authentication required")]
    Unauthorized,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Webhook signature missing or invalid")]
    InvalidSignature,

    // Validation errors
    #[error("Invalid request: {0}")]
    BadRequest(String),

    // Resource errors
    #[error("Resource not found")]
    NotFound,
    #[error("Resource already exists: {0}")]
    Conflict(String),

    // Payment errors
    #[error("Payment not successful")]
    PaymentNotSuccessful,
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("Premium required: {0}")]
    PremiumRequired(String),

    // Internal errors
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Response status and machine-readable code for this error
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            // Distinct from 400 so the gateway can tell "not for you"
            // apart from "malformed"
            ApiError::InvalidSignature => (StatusCode::FORBIDDEN, "INVALID_SIGNATURE"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::PaymentNotSuccessful => {
                (StatusCode::PAYMENT_REQUIRED, "PAYMENT_NOT_SUCCESSFUL")
            }
            ApiError::GatewayUnavailable(_) => (StatusCode::BAD_GATEWAY, "GATEWAY_ERROR"),
            ApiError::QuotaExceeded(_) => (StatusCode::PAYMENT_REQUIRED, "QUOTA_EXCEEDED"),
            ApiError::PremiumRequired(_) => (StatusCode::PAYMENT_REQUIRED, "PREMIUM_REQUIRED"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = match &self {
            // Never leak database details to callers
            ApiError::Database(_) => "Database error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    // PostgreSQL unique violation
                    if code == "23505" {
                        return ApiError::Conflict("Resource already exists".to_string());
                    }
                }
                ApiError::Database(db_err.to_string())
            }
            _ => ApiError::Database(err.to_string()),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::QuestionQuotaExceeded | BillingError::AudioQuotaExceeded => {
                ApiError::QuotaExceeded(err.to_string())
            }
            BillingError::PremiumRequired => ApiError::PremiumRequired(err.to_string()),
            BillingError::VerificationFailed => ApiError::PaymentNotSuccessful,
            // A timed-out or failing gateway call means verification could
            // not complete, not that the payment failed
            BillingError::GatewayTimeout | BillingError::GatewayApi(_) => {
                ApiError::GatewayUnavailable(err.to_string())
            }
            BillingError::WebhookSignatureInvalid => ApiError::InvalidSignature,
            BillingError::MalformedPayload(msg) => ApiError::BadRequest(msg),
            BillingError::UnknownAccount(_) | BillingError::InvalidInput(_) => {
                ApiError::BadRequest(err.to_string())
            }
            BillingError::Database(msg) => ApiError::Database(msg),
            BillingError::Config(msg) => {
                tracing::error!("Billing configuration error: {}", msg);
                ApiError::Internal
            }
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
