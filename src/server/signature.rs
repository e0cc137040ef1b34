//! HMAC-SHA256 signature verification for post-receive deliveries.
//!
//! Whatever fires the post-receive endpoint (a git server hook, usually)
//! signs the request body with a shared secret and puts the result in the
//! `X-Hook-Signature-256` header as `sha256=<hex>`. Verification happens
//! before the body is parsed; unsigned or mis-signed requests never reach
//! the refresh engine.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the HMAC-SHA256 signature of a payload with the given secret.
///
/// Mostly useful for tests and for clients that need to sign their own
/// deliveries.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a raw signature as a header value, `sha256=<hex>`.
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha256={}", hex::encode(signature))
}

/// Verifies a signature header against the payload and secret.
///
/// Returns `false` for malformed headers (missing prefix, bad hex) rather
/// than erroring; a garbage header is just an invalid signature. The
/// comparison itself is constant-time.
///
/// # Examples
///
/// ```
/// use mr_refresh::server::signature::{
///     compute_signature, format_signature_header, verify_signature,
/// };
///
/// let payload = br#"{"project_id": 1}"#;
/// let secret = b"hook-secret";
///
/// let header = format_signature_header(&compute_signature(payload, secret));
/// assert!(verify_signature(payload, &header, secret));
/// assert!(!verify_signature(payload, &header, b"other-secret"));
/// ```
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let claimed = match parse_signature_header(signature_header) {
        Some(bytes) => bytes,
        None => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    mac.verify_slice(&claimed).is_ok()
}

/// Decodes a `sha256=<hex>` header into raw bytes.
fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix("sha256=")?;
    hex::decode(hex_sig).ok()
}
