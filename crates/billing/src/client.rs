//! Paystack gateway client
//!
//! Explicitly constructed and injected into whatever needs it, so the
//! ingestion core stays testable without network access (tests point
//! `base_url` at a local mock server).

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::{BillingError, BillingResult};
use crate::events::ChargeData;

const DEFAULT_BASE_URL: &str = "https://api.paystack.co";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Configuration for the Paystack gateway
#[derive(Debug, Clone)]
pub struct PaystackConfig {
    /// Secret API key, also the webhook signing secret
    pub secret_key: String,
    /// API base URL, overridable for tests
    pub base_url: String,
    /// Where the gateway redirects the user after checkout
    pub callback_url: String,
    /// Premium upgrade price in minor currency units
    pub premium_price_minor: i64,
    /// ISO currency code; GHS is required for Ghanaian mobile money
    pub currency: String,
    /// Bound on every outbound gateway call
    pub timeout: Duration,
}

impl PaystackConfig {
    /// Create config from environment variables
    pub fn from_env() -> BillingResult<Self> {
        Ok(Self {
            secret_key: std::env::var("PAYSTACK_SECRET_KEY")
                .map_err(|_| BillingError::Config("PAYSTACK_SECRET_KEY not set".to_string()))?,
            base_url: std::env::var("PAYSTACK_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            callback_url: std::env::var("PAYMENT_CALLBACK_URL")
                .unwrap_or_else(|_| "http://localhost:3000/payment/verify".to_string()),
            premium_price_minor: std::env::var("PREMIUM_PRICE_MINOR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            currency: std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "GHS".to_string()),
            timeout: Duration::from_secs(
                std::env::var("GATEWAY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        })
    }
}

/// Envelope every gateway response is wrapped in
#[derive(Debug, Deserialize)]
struct GatewayEnvelope {
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Result of initializing a transaction: where to send the user
#[derive(Debug, Clone, Deserialize)]
pub struct InitializedTransaction {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// A verified charge plus the full gateway response retained for audit
#[derive(Debug, Clone)]
pub struct VerifiedCharge {
    pub charge: ChargeData,
    pub raw: serde_json::Value,
}

/// Paystack gateway client
#[derive(Clone)]
pub struct PaystackClient {
    http: reqwest::Client,
    config: PaystackConfig,
}

impl PaystackClient {
    /// Create a new gateway client from config
    pub fn new(config: PaystackConfig) -> BillingResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BillingError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    /// Create a new gateway client from environment variables
    pub fn from_env() -> BillingResult<Self> {
        Self::new(PaystackConfig::from_env()?)
    }

    /// Get the config
    pub fn config(&self) -> &PaystackConfig {
        &self.config
    }

    /// Initialize a premium-upgrade transaction for an account
    ///
    /// The account id rides along in `metadata` and comes back in webhook
    /// deliveries, which is how the asynchronous channel resolves the payer.
    pub async fn initialize_transaction(
        &self,
        email: &str,
        user_id: i64,
    ) -> BillingResult<InitializedTransaction> {
        let url = format!("{}/transaction/initialize", self.config.base_url);
        let body = json!({
            "email": email,
            "amount": self.config.premium_price_minor,
            "currency": self.config.currency,
            "callback_url": self.config.callback_url,
            "metadata": {
                "user_id": user_id,
            },
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await?;

        let (envelope, _) = Self::read_envelope(response).await?;
        serde_json::from_value(envelope.data)
            .map_err(|e| BillingError::MalformedPayload(format!("initialize response: {}", e)))
    }

    /// Verify a transaction by its gateway reference
    ///
    /// Returns the typed charge data plus the full response body, envelope
    /// included, for audit retention; callers decide what a non-success
    /// charge status means.
    pub async fn verify_transaction(&self, reference: &str) -> BillingResult<VerifiedCharge> {
        let url = format!("{}/transaction/verify/{}", self.config.base_url, reference);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;

        let (envelope, raw) = Self::read_envelope(response).await?;
        let charge: ChargeData = serde_json::from_value(envelope.data)
            .map_err(|e| BillingError::MalformedPayload(format!("verify response: {}", e)))?;

        Ok(VerifiedCharge { charge, raw })
    }

    async fn read_envelope(
        response: reqwest::Response,
    ) -> BillingResult<(GatewayEnvelope, serde_json::Value)> {
        let http_status = response.status();
        let text = response.text().await?;

        let raw: serde_json::Value = serde_json::from_str(&text).map_err(|_| {
            BillingError::GatewayApi(format!("unexpected response ({})", http_status))
        })?;
        let envelope: GatewayEnvelope = serde_json::from_value(raw.clone()).map_err(|_| {
            BillingError::GatewayApi(format!("unexpected response ({})", http_status))
        })?;

        if !http_status.is_success() || !envelope.status {
            let message = if envelope.message.is_empty() {
                format!("gateway returned {}", http_status)
            } else {
                envelope.message
            };
            return Err(BillingError::GatewayApi(message));
        }

        Ok((envelope, raw))
    }
}
