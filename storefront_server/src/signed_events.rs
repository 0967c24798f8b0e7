//! Signed webhook deliveries.
//!
//! Two external systems push events at us: the payment gateway (payment succeeded/failed) and the identity provider
//! (user created/updated/deleted). Both sign their deliveries with a shared secret: the `X-…-Signature` header
//! carries `t=<unix-timestamp>,v1=<base64 HMAC-SHA256 of "{t}.{body}">`.
//!
//! Verification is the only way to obtain a [`Verified<T>`] (the type has no public constructor), so a handler that
//! takes `Verified<GatewayEvent>` cannot be fed an unverified payload by any code path. On verification failure the
//! delivery is rejected and nothing is mutated.

use hmac::{Hmac, Mac};
use log::warn;
use serde::{de::DeserializeOwned, Deserialize};
use sha2::Sha256;
use thiserror::Error;

pub use gateway_client::IntentMetadata;

pub const GATEWAY_SIGNATURE_HEADER: &str = "X-Gateway-Signature";
pub const IDENTITY_SIGNATURE_HEADER: &str = "X-Identity-Signature";

#[derive(Debug, Clone, Error)]
pub enum SignatureError {
    #[error("No signature found in the request.")]
    MissingSignature,
    #[error("The signature header is malformed. {0}")]
    MalformedSignature(String),
    #[error("Invalid signature.")]
    InvalidSignature,
    #[error("The event payload could not be parsed. {0}")]
    InvalidPayload(String),
}

/// An event payload that has passed signature verification. Unconstructable outside this module.
#[derive(Debug, Clone)]
pub struct Verified<T> {
    event: T,
}

impl<T> Verified<T> {
    pub fn into_inner(self) -> T {
        self.event
    }
}

impl<T> std::ops::Deref for Verified<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.event
    }
}

/// Verify the signature header against the raw body and, only then, parse the body into an event.
pub fn verify_signed_event<T: DeserializeOwned>(
    header: &str,
    body: &[u8],
    secret: &str,
) -> Result<Verified<T>, SignatureError> {
    let (timestamp, signature) = parse_signature_header(header)?;
    let signature = base64::decode(signature).map_err(|e| SignatureError::MalformedSignature(e.to_string()))?;
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|e| SignatureError::MalformedSignature(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    mac.verify_slice(&signature).map_err(|_| {
        warn!("🔐️ Webhook delivery failed signature verification");
        SignatureError::InvalidSignature
    })?;
    let event = serde_json::from_slice(body).map_err(|e| SignatureError::InvalidPayload(e.to_string()))?;
    Ok(Verified { event })
}

/// Sign a payload the way the external services do. Test/dev use only.
pub fn sign_event(body: &[u8], secret: &str, timestamp: i64) -> String {
    let t = timestamp.to_string();
    let payload = [t.as_bytes(), b".", body].concat();
    let signature = crate::helpers::calculate_hmac(secret, &payload);
    format!("t={t},v1={signature}")
}

fn parse_signature_header(header: &str) -> Result<(&str, &str), SignatureError> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => signature = Some(v),
            _ => {},
        }
    }
    match (timestamp, signature) {
        (Some(t), Some(s)) => Ok((t, s)),
        _ => Err(SignatureError::MalformedSignature("expected t=<timestamp>,v1=<signature>".to_string())),
    }
}

//----------------------------------------   Gateway events   --------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum GatewayEventType {
    #[serde(rename = "payment_intent.succeeded")]
    PaymentSucceeded,
    #[serde(rename = "payment_intent.payment_failed")]
    PaymentFailed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEvent {
    #[serde(rename = "type")]
    pub event_type: GatewayEventType,
    pub data: GatewayEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEventData {
    pub object: GatewayIntent,
}

/// The payment-intent object inside a gateway event. The metadata is the intent metadata the storefront attached at
/// creation, echoed back verbatim. It is the only link from the event to an order.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayIntent {
    pub id: String,
    pub amount: i64,
    pub metadata: IntentMetadata,
}

//----------------------------------------   Identity events   -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum IdentityEventType {
    #[serde(rename = "user.created")]
    UserCreated,
    #[serde(rename = "user.updated")]
    UserUpdated,
    #[serde(rename = "user.deleted")]
    UserDeleted,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityEvent {
    #[serde(rename = "type")]
    pub event_type: IdentityEventType,
    pub data: IdentityUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn event_body() -> Vec<u8> {
        serde_json::json!({
            "type": "payment_intent.succeeded",
            "data": { "object": {
                "id": "pi_3PQxAbc123",
                "amount": 125_280,
                "metadata": { "order_id": 42, "user_id": "user_2xKq" }
            }}
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn valid_signature_verifies_and_parses() {
        let body = event_body();
        let header = sign_event(&body, SECRET, 1_717_000_000);
        let event: Verified<GatewayEvent> = verify_signed_event(&header, &body, SECRET).expect("should verify");
        assert_eq!(event.event_type, GatewayEventType::PaymentSucceeded);
        assert_eq!(event.data.object.metadata.order_id, 42);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = event_body();
        let header = sign_event(&body, "a-different-secret", 1_717_000_000);
        let err = verify_signed_event::<GatewayEvent>(&header, &body, SECRET).unwrap_err();
        assert!(matches!(err, SignatureError::InvalidSignature));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let body = event_body();
        let header = sign_event(&body, SECRET, 1_717_000_000);
        let tampered = String::from_utf8(body).unwrap().replace("42", "43");
        let err = verify_signed_event::<GatewayEvent>(&header, tampered.as_bytes(), SECRET).unwrap_err();
        assert!(matches!(err, SignatureError::InvalidSignature));
    }

    #[test]
    fn malformed_header_is_rejected() {
        let body = event_body();
        let err = verify_signed_event::<GatewayEvent>("v1=only", &body, SECRET).unwrap_err();
        assert!(matches!(err, SignatureError::MalformedSignature(_)));
    }

    #[test]
    fn unknown_event_types_parse_as_other() {
        let body = serde_json::json!({
            "type": "payment_intent.created",
            "data": { "object": {
                "id": "pi_3PQxAbc124",
                "amount": 1000,
                "metadata": { "order_id": 1, "user_id": "user_2xKq" }
            }}
        })
        .to_string()
        .into_bytes();
        let header = sign_event(&body, SECRET, 1_717_000_000);
        let event: Verified<GatewayEvent> = verify_signed_event(&header, &body, SECRET).expect("should verify");
        assert_eq!(event.event_type, GatewayEventType::Other);
    }
}
