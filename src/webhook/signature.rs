//! Webhook signature verification
//!
//! Both inbound webhooks are authenticated with HMAC over the raw
//! request body: the messaging platform signs with SHA-256 (hex digest
//! in an `X-Hub-Signature-256: sha256=...` header), the payment gateway
//! with SHA-512. Unverifiable payloads never reach the dispatcher.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Verify the channel webhook signature header
pub fn verify_channel_signature(
    app_secret: &str,
    signature_header: Option<&str>,
    body: &[u8],
) -> bool {
    if app_secret.is_empty() {
        warn!("Channel app secret not configured - rejecting webhook");
        return false;
    }

    let signature = signature_header.unwrap_or("").trim();
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature).trim();
    if signature.is_empty() {
        warn!("Missing channel webhook signature header");
        return false;
    }

    let Ok(signature_bytes) = hex::decode(signature) else {
        warn!("Malformed channel webhook signature");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature_bytes).is_ok()
}

/// Verify the payment gateway signature header
pub fn verify_gateway_signature(
    secret_key: &str,
    signature_header: Option<&str>,
    body: &[u8],
) -> bool {
    if secret_key.is_empty() {
        warn!("Gateway secret key not configured - rejecting webhook");
        return false;
    }

    let signature = signature_header.unwrap_or("").trim();
    if signature.is_empty() {
        warn!("Missing gateway webhook signature header");
        return false;
    }

    let Ok(signature_bytes) = hex::decode(signature) else {
        warn!("Malformed gateway webhook signature");
        return false;
    };

    let Ok(mut mac) = HmacSha512::new_from_slice(secret_key.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature_bytes).is_ok()
}
