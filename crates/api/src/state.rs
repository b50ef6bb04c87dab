//! Application state

use std::sync::Arc;

use sqlx::PgPool;

use studyhall_billing::{PaymentIngestor, PaystackClient, QuotaLedger, WebhookHandler};

use crate::{auth::JwtManager, config::Config};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub jwt_manager: JwtManager,
    /// Gateway client, constructed by the caller so tests can point it at
    /// a local mock server
    pub paystack: Arc<PaystackClient>,
    pub ingestor: PaymentIngestor,
    pub quota: QuotaLedger,
    pub webhooks: WebhookHandler,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, paystack: PaystackClient) -> Self {
        let jwt_manager = JwtManager::new(&config.jwt_secret, config.jwt_expiry_hours);

        let ingestor = PaymentIngestor::new(pool.clone());
        let webhooks = WebhookHandler::new(&paystack.config().secret_key, ingestor.clone());
        let quota = QuotaLedger::new(pool.clone());

        tracing::info!(
            gateway = %paystack.config().base_url,
            currency = %paystack.config().currency,
            "Payment ingestion initialized"
        );

        Self {
            pool,
            config,
            jwt_manager,
            paystack: Arc::new(paystack),
            ingestor,
            quota,
            webhooks,
        }
    }
}
