use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the provider's signature over the raw payload.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// The only event type that triggers order finalization.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Payment status required before any order is created.
pub const PAYMENT_STATUS_PAID: &str = "paid";

/// Completion notification envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: CheckoutSessionObject,
}

/// The checkout session as delivered on the completion notification.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    /// The external payment reference used as the finalization idempotency
    /// key; the session id stands in when no payment intent is present.
    pub fn payment_reference(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.id)
    }
}

/// Verifies the provider signature over the raw request body.
///
/// The header format is `t=<unix ts>,v1=<hex hmac>`, where the MAC is
/// HMAC-SHA256 of `"{t}.{payload}"` under the shared secret. Timestamps
/// outside the tolerance window are rejected to blunt replay.
pub fn verify_signature(
    headers: &HeaderMap,
    payload: &[u8],
    secret: &str,
    tolerance_secs: u64,
) -> bool {
    let Some(header) = headers.get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok()) else {
        return false;
    };

    let mut ts = "";
    let mut v1 = "";
    for part in header.split(',') {
        let mut it = part.trim().split('=');
        match (it.next(), it.next()) {
            (Some("t"), Some(val)) => ts = val,
            (Some("v1"), Some(val)) => v1 = val,
            _ => {}
        }
    }
    if ts.is_empty() || v1.is_empty() {
        return false;
    }

    let Ok(ts_i) = ts.parse::<i64>() else {
        return false;
    };
    let now = chrono::Utc::now().timestamp();
    if (now - ts_i).unsigned_abs() > tolerance_secs {
        return false;
    }

    let expected = compute_signature(payload, secret, ts_i);
    constant_time_eq(&expected, v1)
}

/// Builds a `t=...,v1=...` header value for the given payload; the
/// counterpart of [`verify_signature`], used by tests and delivery
/// tooling.
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    format!(
        "t={},v1={}",
        timestamp,
        compute_signature(payload, secret, timestamp)
    )
}

fn compute_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "whsec_test_secret";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn valid_signature_passes() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let now = chrono::Utc::now().timestamp();
        let headers = headers_with(&signature_header(payload, SECRET, now));
        assert!(verify_signature(&headers, payload, SECRET, 300));
    }

    #[test]
    fn tampered_payload_fails() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let now = chrono::Utc::now().timestamp();
        let headers = headers_with(&signature_header(payload, SECRET, now));
        assert!(!verify_signature(&headers, b"{}", SECRET, 300));
    }

    #[test]
    fn wrong_secret_fails() {
        let payload = b"payload";
        let now = chrono::Utc::now().timestamp();
        let headers = headers_with(&signature_header(payload, "whsec_other", now));
        assert!(!verify_signature(&headers, payload, SECRET, 300));
    }

    #[test]
    fn stale_timestamp_fails() {
        let payload = b"payload";
        let stale = chrono::Utc::now().timestamp() - 3600;
        let headers = headers_with(&signature_header(payload, SECRET, stale));
        assert!(!verify_signature(&headers, payload, SECRET, 300));
    }

    #[test]
    fn missing_header_fails() {
        assert!(!verify_signature(&HeaderMap::new(), b"payload", SECRET, 300));
    }

    #[test]
    fn payment_reference_falls_back_to_session_id() {
        let session = CheckoutSessionObject {
            id: "cs_123".into(),
            payment_status: PAYMENT_STATUS_PAID.into(),
            payment_intent: None,
            metadata: HashMap::new(),
        };
        assert_eq!(session.payment_reference(), "cs_123");
    }
}
