//! Gateway wire types
//!
//! Schema-validated payloads for the webhook channel and the verify-by-
//! reference endpoint. Parsing rejects on schema mismatch instead of
//! surfacing field errors deep in processing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, BillingResult};

/// Webhook envelope: every delivery carries an event type plus a payload
/// whose shape depends on the event
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Charge payload shared by `charge.success` webhooks and the verify endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeData {
    pub reference: String,
    /// Minor currency units as reported by the gateway
    pub amount: i64,
    pub currency: String,
    /// Payment channel, e.g. card or mobile_money
    pub channel: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: Option<ChargeMetadata>,
}

impl ChargeData {
    /// Convert the gateway's minor units to major units (divide by 100)
    pub fn amount_major(&self) -> Decimal {
        Decimal::new(self.amount, 2)
    }

    /// Account id embedded by us at transaction initialization
    pub fn user_id(&self) -> Option<i64> {
        self.metadata.as_ref().map(|m| m.user_id)
    }
}

/// Metadata we attach at initialization and the gateway echoes back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeMetadata {
    #[serde(deserialize_with = "deserialize_user_id")]
    pub user_id: i64,
}

// The gateway echoes metadata back as it was serialized, which for some
// channels turns numbers into strings. Accept both.
fn deserialize_user_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(n) => Ok(n),
        IntOrString::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// A parsed webhook delivery
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    /// A completed charge we should record
    ChargeSuccess(ChargeData),
    /// Any other event type is inert, not an error
    Other(String),
}

/// Parse a raw webhook body into a typed event
///
/// Only `charge.success` payloads are held to the charge schema; future
/// event types pass through as [`WebhookEvent::Other`].
pub fn parse_webhook(body: &str) -> BillingResult<WebhookEvent> {
    let envelope: WebhookEnvelope = serde_json::from_str(body)
        .map_err(|e| BillingError::MalformedPayload(e.to_string()))?;

    if envelope.event == "charge.success" {
        let charge: ChargeData = serde_json::from_value(envelope.data)
            .map_err(|e| BillingError::MalformedPayload(e.to_string()))?;
        Ok(WebhookEvent::ChargeSuccess(charge))
    } else {
        Ok(WebhookEvent::Other(envelope.event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHARGE_SUCCESS_BODY: &str = r#"{
        "event": "charge.success",
        "data": {
            "reference": "r1",
            "amount": 500,
            "currency": "GHS",
            "channel": "mobile_money",
            "metadata": {"user_id": 7}
        }
    }"#;

    #[test]
    fn test_parse_charge_success() {
        let event = parse_webhook(CHARGE_SUCCESS_BODY).expect("should parse");
        match event {
            WebhookEvent::ChargeSuccess(charge) => {
                assert_eq!(charge.reference, "r1");
                assert_eq!(charge.amount, 500);
                assert_eq!(charge.amount_major().to_string(), "5.00");
                assert_eq!(charge.currency, "GHS");
                assert_eq!(charge.channel, "mobile_money");
                assert_eq!(charge.user_id(), Some(7));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_inert() {
        let body = r#"{"event": "transfer.success", "data": {"anything": true}}"#;
        match parse_webhook(body).expect("should parse") {
            WebhookEvent::Other(event) => assert_eq!(event, "transfer.success"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_with_missing_data_is_inert() {
        let body = r#"{"event": "subscription.create"}"#;
        assert!(matches!(
            parse_webhook(body).expect("should parse"),
            WebhookEvent::Other(_)
        ));
    }

    #[test]
    fn test_charge_success_with_schema_mismatch_rejected() {
        // amount missing
        let body = r#"{
            "event": "charge.success",
            "data": {"reference": "r1", "currency": "GHS", "channel": "card"}
        }"#;
        assert!(matches!(
            parse_webhook(body),
            Err(BillingError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_non_json_body_rejected() {
        assert!(matches!(
            parse_webhook("not json"),
            Err(BillingError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_metadata_user_id_as_string() {
        let body = r#"{
            "event": "charge.success",
            "data": {
                "reference": "r2",
                "amount": 1000,
                "currency": "GHS",
                "channel": "card",
                "metadata": {"user_id": "42"}
            }
        }"#;
        match parse_webhook(body).expect("should parse") {
            WebhookEvent::ChargeSuccess(charge) => assert_eq!(charge.user_id(), Some(42)),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_amount_conversion_examples() {
        let charge = ChargeData {
            reference: "r".into(),
            amount: 1000,
            currency: "GHS".into(),
            channel: "card".into(),
            status: None,
            metadata: None,
        };
        assert_eq!(charge.amount_major().to_string(), "10.00");
    }
}
