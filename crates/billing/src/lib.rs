// Allow unwrap()/expect() in tests for cleaner test code
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Studyhall Billing Module
//!
//! Handles Paystack integration for premium upgrades and usage quota
//! accounting.
//!
//! ## Features
//!
//! - **Payment Ingestion**: one idempotent write path fed by two delivery
//!   channels, the redirect verify flow and the asynchronous webhook
//! - **Webhook Verification**: HMAC-SHA-512 over the raw body, constant
//!   time comparison
//! - **Quota Ledger**: free-tier ceilings for questions and audio minutes,
//!   premium gating, monthly reset

pub mod client;
pub mod error;
pub mod events;
pub mod ingest;
pub mod quota;
pub mod webhook;

// Client
pub use client::{InitializedTransaction, PaystackClient, PaystackConfig, VerifiedCharge};

// Error
pub use error::{BillingError, BillingResult};

// Events
pub use events::{parse_webhook, ChargeData, ChargeMetadata, WebhookEnvelope, WebhookEvent};

// Ingest
pub use ingest::{IngestOutcome, PaymentIngestor, VerifiedPayment};

// Quota
pub use quota::{QuotaLedger, QuotaUsage};

// Webhook
pub use webhook::{WebhookHandler, WebhookOutcome, WebhookVerifier};
