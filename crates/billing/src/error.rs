//! Billing error types

use thiserror::Error;

/// Billing-specific errors
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Gateway API error: {0}")]
    GatewayApi(String),

    #[error("Gateway request timed out")]
    GatewayTimeout,

    #[error("Payment not successful")]
    VerificationFailed,

    #[error("Webhook signature verification failed")]
    WebhookSignatureInvalid,

    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error("No account for user id {0}")]
    UnknownAccount(i64),

    #[error("Free question limit reached. Upgrade to premium.")]
    QuestionQuotaExceeded,

    #[error("Free audio limit reached. Upgrade to premium.")]
    AudioQuotaExceeded,

    #[error("This question type requires a premium account.")]
    PremiumRequired,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for BillingError {
    fn from(err: sqlx::Error) -> Self {
        BillingError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for BillingError {
    fn from(err: reqwest::Error) -> Self {
        // A timed-out verify call means "verification failed", never
        // "payment failed"; the caller may retry the verify flow.
        if err.is_timeout() {
            BillingError::GatewayTimeout
        } else {
            BillingError::GatewayApi(err.to_string())
        }
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
