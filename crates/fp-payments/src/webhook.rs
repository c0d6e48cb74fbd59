//! Stripe webhook signature verification and event parsing.
//!
//! Header format: `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]`.
//! The signed payload is `"{t}.{raw body}"` under HMAC-SHA256 with the
//! endpoint secret.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use uuid::Uuid;

use crate::stripe::payment_intent_id;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("missing signature header")]
    MissingHeader,
    #[error("malformed webhook: {0}")]
    Malformed(String),
    #[error("signature mismatch")]
    Mismatch,
    #[error("signature timestamp outside tolerance")]
    Expired,
}

/// Verify a `Stripe-Signature` header against the raw request body.
pub fn verify_stripe_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        let Some((k, v)) = part.trim().split_once('=') else {
            continue;
        };
        match k {
            "t" => {
                timestamp = Some(
                    v.parse()
                        .map_err(|_| WebhookError::Malformed("bad timestamp".to_string()))?,
                )
            }
            "v1" => {
                if let Ok(bytes) = hex::decode(v) {
                    candidates.push(bytes);
                }
            }
            _ => {}
        }
    }

    let t = timestamp.ok_or_else(|| WebhookError::Malformed("no timestamp".to_string()))?;
    if candidates.is_empty() {
        return Err(WebhookError::Malformed("no v1 signature".to_string()));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::Malformed("bad secret".to_string()))?;
    mac.update(t.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    // verify_slice is constant time; clone per candidate since it consumes.
    let matched = candidates
        .iter()
        .any(|sig| mac.clone().verify_slice(sig).is_ok());
    if !matched {
        return Err(WebhookError::Mismatch);
    }

    if tolerance_secs > 0 && (now - t).abs() > tolerance_secs {
        return Err(WebhookError::Expired);
    }
    Ok(())
}

/// Produce a header value the way Stripe does.
pub fn sign_stripe_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        // HMAC accepts keys of any length.
        Err(_) => return String::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    CheckoutCompleted {
        session_id: String,
        order_id: Option<Uuid>,
        payment_intent: Option<String>,
    },
    CheckoutExpired {
        session_id: String,
        order_id: Option<Uuid>,
    },
    /// Acknowledged and ignored.
    Other(String),
}

#[derive(Debug, Clone)]
pub struct ParsedEvent {
    pub id: String,
    pub event_type: String,
    pub event: WebhookEvent,
    pub raw: Value,
}

pub fn parse_event(payload: &[u8]) -> Result<ParsedEvent, WebhookError> {
    let raw: Value = serde_json::from_slice(payload)
        .map_err(|e| WebhookError::Malformed(format!("invalid json: {e}")))?;

    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| WebhookError::Malformed("missing id".to_string()))?
        .to_string();
    let event_type = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| WebhookError::Malformed("missing type".to_string()))?
        .to_string();

    let object = raw.pointer("/data/object");
    let session = || -> Result<(String, Option<Uuid>), WebhookError> {
        let obj = object.ok_or_else(|| WebhookError::Malformed("missing data.object".into()))?;
        let session_id = obj
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| WebhookError::Malformed("missing session id".into()))?
            .to_string();
        let order_id = obj
            .pointer("/metadata/orderId")
            .or_else(|| obj.get("client_reference_id"))
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok());
        Ok((session_id, order_id))
    };

    let event = match event_type.as_str() {
        "checkout.session.completed" => {
            let (session_id, order_id) = session()?;
            WebhookEvent::CheckoutCompleted {
                session_id,
                order_id,
                payment_intent: payment_intent_id(object.and_then(|o| o.get("payment_intent"))),
            }
        }
        "checkout.session.expired" => {
            let (session_id, order_id) = session()?;
            WebhookEvent::CheckoutExpired {
                session_id,
                order_id,
            }
        }
        other => WebhookEvent::Other(other.to_string()),
    };

    Ok(ParsedEvent {
        id,
        event_type,
        event,
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "whsec_test";

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign_stripe_payload(body, SECRET, 1_700_000_000);
        assert_eq!(
            verify_stripe_signature(body, &header, SECRET, 1_700_000_010, 300),
            Ok(())
        );
    }

    #[test]
    fn tampered_body_or_wrong_secret_fails() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign_stripe_payload(body, SECRET, 1_700_000_000);
        assert_eq!(
            verify_stripe_signature(br#"{"id":"evt_2"}"#, &header, SECRET, 1_700_000_000, 300),
            Err(WebhookError::Mismatch)
        );
        assert_eq!(
            verify_stripe_signature(body, &header, "whsec_other", 1_700_000_000, 300),
            Err(WebhookError::Mismatch)
        );
    }

    #[test]
    fn stale_timestamp_is_expired() {
        let body = b"{}";
        let header = sign_stripe_payload(body, SECRET, 1_700_000_000);
        assert_eq!(
            verify_stripe_signature(body, &header, SECRET, 1_700_000_301, 300),
            Err(WebhookError::Expired)
        );
    }

    #[test]
    fn any_matching_v1_is_accepted() {
        let body = b"{}";
        let good = sign_stripe_payload(body, SECRET, 10);
        let v1 = good.split("v1=").nth(1).unwrap();
        let header = format!("t=10,v1={},v1={v1}", "00".repeat(32));
        assert_eq!(verify_stripe_signature(body, &header, SECRET, 10, 300), Ok(()));
    }

    #[test]
    fn malformed_headers() {
        assert!(matches!(
            verify_stripe_signature(b"{}", "v1=abcd", SECRET, 0, 300),
            Err(WebhookError::Malformed(_))
        ));
        assert!(matches!(
            verify_stripe_signature(b"{}", "t=1", SECRET, 0, 300),
            Err(WebhookError::Malformed(_))
        ));
        assert!(matches!(
            verify_stripe_signature(b"{}", "t=abc,v1=00", SECRET, 0, 300),
            Err(WebhookError::Malformed(_))
        ));
    }

    #[test]
    fn parses_completed_session() {
        let order_id = Uuid::new_v4();
        let body = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_1",
                "payment_intent": "pi_1",
                "metadata": {"orderId": order_id.to_string()}
            }}
        });
        let parsed = parse_event(body.to_string().as_bytes()).unwrap();
        assert_eq!(parsed.id, "evt_1");
        assert_eq!(
            parsed.event,
            WebhookEvent::CheckoutCompleted {
                session_id: "cs_1".to_string(),
                order_id: Some(order_id),
                payment_intent: Some("pi_1".to_string()),
            }
        );
    }

    #[test]
    fn expired_falls_back_to_client_reference() {
        let order_id = Uuid::new_v4();
        let body = json!({
            "id": "evt_2",
            "type": "checkout.session.expired",
            "data": {"object": {"id": "cs_2", "client_reference_id": order_id.to_string()}}
        });
        let parsed = parse_event(body.to_string().as_bytes()).unwrap();
        assert_eq!(
            parsed.event,
            WebhookEvent::CheckoutExpired {
                session_id: "cs_2".to_string(),
                order_id: Some(order_id),
            }
        );
    }

    #[test]
    fn unknown_types_are_other() {
        let body = json!({"id": "evt_3", "type": "charge.refunded", "data": {"object": {}}});
        let parsed = parse_event(body.to_string().as_bytes()).unwrap();
        assert_eq!(parsed.event, WebhookEvent::Other("charge.refunded".to_string()));
    }

    #[test]
    fn missing_id_is_malformed() {
        assert!(matches!(
            parse_event(br#"{"type":"x"}"#),
            Err(WebhookError::Malformed(_))
        ));
        assert!(matches!(parse_event(b"not json"), Err(WebhookError::Malformed(_))));
    }
}
