//! HMAC-SHA256 signatures used by the payment gateway.
//!
//! The gateway signs two things differently and both schemes are kept:
//! - checkout callbacks: `hex(hmac(key_secret, order_id + "|" + payment_id))`
//! - webhooks: `hex(hmac(webhook_secret, raw_request_body))`

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::errors::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `message`.
pub fn sign(secret: &str, message: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::configuration(format!("invalid signing secret: {}", e)))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn payment_signature(secret: &str, order_id: &str, payment_id: &str) -> Result<String> {
    sign(secret, format!("{}|{}", order_id, payment_id).as_bytes())
}

pub fn verify_payment_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<bool> {
    let expected = payment_signature(secret, order_id, payment_id)?;
    Ok(constant_time_eq(&expected, signature))
}

pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> Result<bool> {
    let expected = sign(secret, body)?;
    Ok(constant_time_eq(&expected, signature))
}

fn constant_time_eq(expected: &str, supplied: &str) -> bool {
    expected.as_bytes().ct_eq(supplied.trim().as_bytes()).into()
}
