//! Webhook signature verification and event parsing
//!
//! Signature header format: `t=<unix timestamp>,v1=<hex hmac-sha256("t.body")>`

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{BillingError, ProviderSubscription};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "billing-signature";

/// Maximum accepted age of a signed payload, in seconds
const TOLERANCE_SECS: u64 = 300;

pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(), BillingError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(BillingError::InvalidSignature)?;
    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| BillingError::InvalidSignature)?;
    if now.timestamp().abs_diff(signed_at) > TOLERANCE_SECS {
        return Err(BillingError::InvalidSignature);
    }

    let expected = sign(payload, timestamp, secret)?;
    let matched = signatures
        .iter()
        .any(|sig| bool::from(expected.as_bytes().ct_eq(sig.as_bytes())));

    if matched {
        Ok(())
    } else {
        Err(BillingError::InvalidSignature)
    }
}

fn sign(payload: &[u8], timestamp: &str, secret: &str) -> Result<String, BillingError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| BillingError::InvalidSignature)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: serde_json::Value,
}

/// Subscription lifecycle events we reconcile
pub const SUBSCRIPTION_EVENTS: &[&str] = &[
    "customer.subscription.created",
    "customer.subscription.updated",
    "customer.subscription.deleted",
];

pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, BillingError> {
    serde_json::from_slice(payload).map_err(|e| BillingError::InvalidPayload(e.to_string()))
}

impl WebhookEvent {
    /// The subscription carried by a lifecycle event, `None` for other events
    pub fn subscription(&self) -> Result<Option<ProviderSubscription>, BillingError> {
        if !SUBSCRIPTION_EVENTS.contains(&self.event_type.as_str()) {
            return Ok(None);
        }
        serde_json::from_value(self.data.object.clone())
            .map(Some)
            .map_err(|e| BillingError::InvalidPayload(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) fn signature_header_for(payload: &[u8], secret: &str, now: DateTime<Utc>) -> String {
    let timestamp = now.timestamp().to_string();
    let signature = sign(payload, &timestamp, secret).unwrap();
    format!("t={},v1={}", timestamp, signature)
}
