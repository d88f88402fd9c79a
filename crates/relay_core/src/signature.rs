//! HMAC-SHA256 webhook signature verification.
//!
//! Bitbucket signs the request body with the shared webhook secret and sends
//! the digest in `X-Hub-Signature` as `sha256=<hex>`. Digests are compared in
//! constant time.
//!
//! Some relays re-serialize the JSON body with different whitespace before it
//! reaches us. When the body as received does not verify, the body is parsed
//! and re-serialized in compact form (key order preserved) and checked once
//! more. Nothing else about the body is changed.

use hmac::{Hmac, Mac};
use http::HeaderMap;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::errors::SignatureError;
use crate::request::{header_value, SIGNATURE_HEADER};

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Computes the hex-encoded HMAC-SHA256 of `payload` keyed with `secret`.
///
/// # Errors
/// Returns `SignatureError::InvalidHmacKey` if the MAC cannot be initialised.
pub fn hex_hmac_sha256(payload: &[u8], secret: &str) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidHmacKey)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Computes HMAC-SHA256 signature for webhook payload.
///
/// # Arguments
/// * `payload` - Raw payload bytes
/// * `secret` - Shared secret for signing
///
/// # Returns
/// Signature in format: `"sha256=<hex-encoded-signature>"`
pub fn compute_hmac_sha256(payload: &[u8], secret: &str) -> Result<String, SignatureError> {
    Ok(format!("{}{}", SIGNATURE_PREFIX, hex_hmac_sha256(payload, secret)?))
}

/// Checks `signature` against the HMAC-SHA256 of `raw_body`.
///
/// `signature` may carry the `sha256=` prefix or be the bare hex digest.
/// Digests of different length never match.
pub fn verify(raw_body: &str, signature: &str, secret: &str) -> bool {
    let supplied = signature
        .trim()
        .strip_prefix(SIGNATURE_PREFIX)
        .unwrap_or(signature.trim())
        .to_ascii_lowercase();

    let Ok(expected) = hex_hmac_sha256(raw_body.as_bytes(), secret) else {
        return false;
    };

    if supplied.len() != expected.len() {
        return false;
    }

    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}

/// Re-serializes a JSON document without insignificant whitespace.
///
/// Returns `None` when `raw_body` is not JSON.
pub fn minify_json(raw_body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_body).ok()?;
    serde_json::to_string(&value).ok()
}

/// Verifies a signature value, retrying once against the minified body.
///
/// # Errors
/// - `SignatureError::MissingSignature` when `signature` is absent or blank
/// - `SignatureError::Mismatch` when neither the raw nor the minified body verifies
pub fn validate_signature(
    signature: Option<&str>,
    raw_body: &str,
    secret: &str,
) -> Result<(), SignatureError> {
    let signature = signature
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(SignatureError::MissingSignature)?;

    if verify(raw_body, signature, secret) {
        return Ok(());
    }

    match minify_json(raw_body) {
        Some(minified) if minified != raw_body => {
            if verify(&minified, signature, secret) {
                debug!("Signature verified against minified body");
                return Ok(());
            }
            Err(SignatureError::Mismatch)
        }
        _ => Err(SignatureError::Mismatch),
    }
}

/// Locates `X-Hub-Signature` (case-insensitive) and verifies it against `raw_body`.
///
/// # Errors
/// See [`validate_signature`].
pub fn validate(headers: &HeaderMap, raw_body: &str, secret: &str) -> Result<(), SignatureError> {
    validate_signature(header_value(headers, SIGNATURE_HEADER), raw_body, secret)
}
