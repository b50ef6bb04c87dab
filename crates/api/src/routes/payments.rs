//! Payment routes: initiation, redirect verification, webhook ingestion

use axum::{
    extract::{Extension, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use studyhall_billing::IngestOutcome;

use crate::{auth::AuthUser, error::ApiError, state::AppState};

const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Response from initiating a checkout
#[derive(Debug, Serialize)]
pub struct InitiateResponse {
    pub authorization_url: String,
    pub reference: String,
}

/// Query params for the redirect verify flow
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub reference: Option<String>,
}

/// Response from a successful verification
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub status: String,
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
    /// True when the webhook beat us to this reference
    pub already_recorded: bool,
}

/// One entry of an account's payment history
#[derive(Debug, Serialize)]
pub struct PaymentHistoryItem {
    pub id: uuid::Uuid,
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
}

/// Start a premium-upgrade checkout with the gateway
pub async fn initiate_payment(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<InitiateResponse>, ApiError> {
    let init = state
        .paystack
        .initialize_transaction(&auth_user.email, auth_user.user_id)
        .await?;

    tracing::info!(
        user_id = auth_user.user_id,
        reference = %init.reference,
        "Checkout initialized"
    );

    Ok(Json(InitiateResponse {
        authorization_url: init.authorization_url,
        reference: init.reference,
    }))
}

/// Channel A: verify a reference after the gateway redirected the user back
///
/// Best-effort fast path for UI responsiveness; the webhook remains the
/// authoritative delivery. Constrained to the authenticated caller.
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerifyResponse>, ApiError> {
    // Fail fast before any network call
    let reference = match query.reference.as_deref() {
        Some(r) if !r.is_empty() => r,
        _ => return Err(ApiError::BadRequest("Missing reference".to_string())),
    };

    let verified = state
        .ingestor
        .verify_and_record(&state.paystack, auth_user.user_id, reference)
        .await?;

    Ok(Json(VerifyResponse {
        status: "success".to_string(),
        reference: verified.charge.reference.clone(),
        amount: verified.charge.amount_major(),
        currency: verified.charge.currency.clone(),
        already_recorded: verified.outcome == IngestOutcome::AlreadyRecorded,
    }))
}

/// Channel B: asynchronous webhook push from the gateway
///
/// Public route; the body signature is the authentication. Non-POST
/// deliveries never reach here (the router answers 405). Failures after
/// the signature check respond with an error status and stop there; the
/// gateway's retry machinery takes it from the status code.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Webhook delivery missing signature header");
            ApiError::InvalidSignature
        })?;

    if !state.webhooks.verify_signature(body.as_bytes(), signature) {
        tracing::warn!(body_len = body.len(), "Webhook signature verification failed");
        return Err(ApiError::InvalidSignature);
    }

    let outcome = state.webhooks.process(&body).await?;
    tracing::info!(outcome = ?outcome, "Webhook processed");

    Ok((StatusCode::OK, Json(json!({"status": "success"}))))
}

/// Payment history for the authenticated account
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<PaymentHistoryItem>>, ApiError> {
    let records = state.ingestor.payments_for_user(auth_user.user_id).await?;

    Ok(Json(
        records
            .into_iter()
            .map(|r| PaymentHistoryItem {
                id: r.id,
                reference: r.gateway_reference,
                amount: r.amount,
                currency: r.currency,
                payment_method: r.payment_method,
                status: r.status.to_string(),
                created_at: format_datetime(r.created_at),
                completed_at: r.completed_at.map(format_datetime),
            })
            .collect(),
    ))
}

fn format_datetime(dt: time::OffsetDateTime) -> String {
    dt.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
