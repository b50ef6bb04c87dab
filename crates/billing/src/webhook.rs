//! Webhook verification and processing
//!
//! The signature is the sole authentication mechanism for this channel:
//! no signature, no trust. Verification is hex HMAC-SHA-512 of the raw
//! request body under the shared gateway secret, compared in constant
//! time.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::error::{BillingError, BillingResult};
use crate::events::{parse_webhook, WebhookEvent};
use crate::ingest::{IngestOutcome, PaymentIngestor};

type HmacSha512 = Hmac<Sha512>;

/// Verifies gateway signatures over raw webhook bodies
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    /// Check a hex HMAC-SHA-512 signature against the raw body
    ///
    /// Any decode or MAC failure is simply "not verified"; the caller
    /// never learns which check failed.
    pub fn verify(&self, body: &[u8], signature_hex: &str) -> bool {
        let provided = match hex::decode(signature_hex) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        let mut mac = match HmacSha512::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(body);
        let expected = mac.finalize().into_bytes();

        constant_time_eq(&provided, &expected)
    }
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        // Do a dummy comparison to avoid length-based timing attacks
        let dummy = vec![0u8; b.len()];
        let _ = dummy.ct_eq(b);
        return false;
    }
    a.ct_eq(b).into()
}

/// Result of processing a verified webhook delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A charge was recorded and the account upgraded
    Recorded,
    /// The charge reference was already on file
    AlreadyRecorded,
    /// Event type we do not act on; acknowledged without side effects
    Ignored(String),
}

/// Handles verified webhook deliveries from the gateway
#[derive(Clone)]
pub struct WebhookHandler {
    verifier: WebhookVerifier,
    ingestor: PaymentIngestor,
}

impl WebhookHandler {
    pub fn new(secret: &str, ingestor: PaymentIngestor) -> Self {
        Self {
            verifier: WebhookVerifier::new(secret),
            ingestor,
        }
    }

    /// Check the delivery signature against the raw body
    pub fn verify_signature(&self, body: &[u8], signature_hex: &str) -> bool {
        self.verifier.verify(body, signature_hex)
    }

    /// Process an already-authenticated webhook body
    ///
    /// `charge.success` resolves the payer from `metadata.user_id` and
    /// converges on the idempotent ingestion path; every other event type
    /// is inert. Parse and lookup failures surface as errors for the
    /// caller to turn into a response status; the gateway's retry
    /// semantics rely on that status code.
    pub async fn process(&self, body: &str) -> BillingResult<WebhookOutcome> {
        let event = parse_webhook(body)?;

        let charge = match event {
            WebhookEvent::ChargeSuccess(charge) => charge,
            WebhookEvent::Other(event_type) => {
                tracing::debug!(event = %event_type, "Ignoring webhook event type");
                return Ok(WebhookOutcome::Ignored(event_type));
            }
        };

        let user_id = charge.user_id().ok_or_else(|| {
            BillingError::MalformedPayload("metadata.user_id missing".to_string())
        })?;

        if !self.ingestor.account_exists(user_id).await? {
            tracing::warn!(
                user_id = user_id,
                reference = %charge.reference,
                "Webhook names an unknown account"
            );
            return Err(BillingError::UnknownAccount(user_id));
        }

        // Retain the full delivery, envelope included, for audit
        let raw: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| BillingError::MalformedPayload(e.to_string()))?;

        let outcome = self
            .ingestor
            .record_successful_charge(user_id, &charge, &raw)
            .await?;

        Ok(match outcome {
            IngestOutcome::Recorded => WebhookOutcome::Recorded,
            IngestOutcome::AlreadyRecorded => WebhookOutcome::AlreadyRecorded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "sk_test_webhook_secret";

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac =
            HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_accepted() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = br#"{"event":"charge.success","data":{"reference":"r1"}}"#;
        let signature = sign(SECRET, body);

        assert!(verifier.verify(body, &signature));
    }

    #[test]
    fn test_uppercase_hex_signature_accepted() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = b"payload";
        let signature = sign(SECRET, body).to_uppercase();

        assert!(verifier.verify(body, &signature));
    }

    #[test]
    fn test_mutated_body_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = br#"{"event":"charge.success","data":{"amount":500}}"#.to_vec();
        let signature = sign(SECRET, &body);

        // Flip one bit of the body
        let mut mutated = body.clone();
        mutated[10] ^= 0x01;

        assert!(verifier.verify(&body, &signature));
        assert!(!verifier.verify(&mutated, &signature));
    }

    #[test]
    fn test_mutated_signature_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = b"payload";
        let signature = sign(SECRET, body);

        let mut tampered = signature.clone().into_bytes();
        // Flip a hex nibble
        tampered[0] = if tampered[0] == b'0' { b'1' } else { b'0' };
        let tampered = String::from_utf8(tampered).expect("still utf8");

        assert!(!verifier.verify(body, &tampered));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let body = b"payload";
        let signature = sign("some_other_secret", body);

        assert!(!verifier.verify(body, &signature));
    }

    #[test]
    fn test_garbage_signature_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        assert!(!verifier.verify(b"payload", "not-hex"));
        assert!(!verifier.verify(b"payload", ""));
        assert!(!verifier.verify(b"payload", "abc")); // odd length
        assert!(!verifier.verify(b"payload", "deadbeef")); // wrong length
    }
}
