//! HMAC-SHA256 signatures on identity-service webhooks.

use crate::errors::GateError;
use ring::hmac;

/// Header carrying the hex signature of the raw request body.
pub const SIGNATURE_HEADER: &str = "x-supabase-signature";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify `signature` (hex, optionally `sha256=`-prefixed) over `body`.
///
/// The comparison is constant-time.
///
/// # Errors
///
/// Returns `GateError::Unauthorized` if the signature is missing, not hex, or
/// does not match.
pub fn verify_hook_signature(
    secret: &[u8],
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), GateError> {
    let signature = signature
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GateError::Unauthorized("missing signature".to_string()))?;

    let hex_digest = signature.strip_prefix(SIGNATURE_PREFIX).unwrap_or(signature);
    let tag = hex::decode(hex_digest.to_ascii_lowercase()).map_err(|_| {
        tracing::debug!(target: "gate.auth.hook", "Signature is not valid hex");
        GateError::Unauthorized("invalid signature".to_string())
    })?;

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    hmac::verify(&key, body, &tag).map_err(|_| {
        tracing::debug!(target: "gate.auth.hook", "Signature mismatch");
        GateError::Unauthorized("invalid signature".to_string())
    })
}

/// Hex HMAC-SHA256 of `body`, the format the identity service sends.
pub fn sign_hook_body(secret: &[u8], body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    hex::encode(hmac::sign(&key, body).as_ref())
}
