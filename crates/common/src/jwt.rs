//! JWT utilities shared by the gate and its test harness.
//!
//! - Size limit applied before any parsing
//! - Clock skew constants for `iat` validation
//! - Unverified peeking at the `kid` header and `iss` claim, used only to pick
//!   the right verification key
//! - `iat` validation
//! - Ed25519 JWK key decoding
//!
//! # Security
//!
//! Nothing returned by the peeking functions is trusted. The token MUST still
//! be signature-verified against a key from the issuer's published key set.
//! Error messages are generic; details are logged at debug level.
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_kid, extract_unverified_issuer, validate_iat, DEFAULT_CLOCK_SKEW};
//!
//! let kid = extract_kid(token)?;
//! let issuer = extract_unverified_issuer(token)?;
//! // ... fetch key for (issuer, kid) and verify the signature ...
//! validate_iat(claims.iat, DEFAULT_CLOCK_SKEW)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Identity-service access tokens are typically under 1KB. Anything larger is
/// rejected BEFORE base64 decoding or signature verification so oversized
/// tokens cost almost nothing to refuse.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes).
///
/// Tokens with `iat` further than this in the future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT before verification.
///
/// All variants share one generic message so callers cannot leak which check
/// failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The access token is invalid or expired")]
    MissingKid,

    /// Token payload is missing the `iss` claim.
    #[error("The access token is invalid or expired")]
    MissingIssuer,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Functions
// =============================================================================

/// Split a token into its three segments after the size check.
fn split_segments(token: &str) -> Result<[&str; 3], JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Ok([header, payload, signature]),
        _ => {
            tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
            Err(JwtValidationError::MalformedToken)
        }
    }
}

/// Decode one base64url JSON segment of a token.
fn decode_segment(segment: &str) -> Result<serde_json::Value, JwtValidationError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT segment base64");
        JwtValidationError::MalformedToken
    })?;

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT segment JSON");
        JwtValidationError::MalformedToken
    })
}

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong structure, bad base64, or invalid JSON
/// - `MissingKid` - Header has no `kid`, or it is not a non-empty string
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    let [header_part, _, _] = split_segments(token)?;
    let header = decode_segment(header_part)?;

    header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)
}

/// Extract the `iss` claim from a JWT payload without verifying the signature.
///
/// The value only selects which issuer's key set to consult; the verifier
/// compares it against the configured issuer before fetching anything.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong structure, bad base64, or invalid JSON
/// - `MissingIssuer` - Payload has no `iss`, or it is not a non-empty string
pub fn extract_unverified_issuer(token: &str) -> Result<String, JwtValidationError> {
    let [_, payload_part, _] = split_segments(token)?;
    let payload = decode_segment(payload_part)?;

    payload
        .get("iss")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingIssuer)
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat` is more than
/// `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // clock_skew is bounded by MAX_CLOCK_SKEW at config load
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Decode an Ed25519 public key from a JWK `x` field (base64url, no padding).
///
/// # Errors
///
/// Returns `base64::DecodeError` if the value is not valid base64url.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(x_b64url)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_possible_wrap)]
mod tests {
    use super::*;

    fn token_with(header: &str, payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_clock_skew_constants() {
        assert_eq!(DEFAULT_CLOCK_SKEW, Duration::from_secs(300));
        assert_eq!(MAX_CLOCK_SKEW, Duration::from_secs(600));
    }

    // -------------------------------------------------------------------------
    // extract_kid Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_extract_kid_valid_token() {
        let token = token_with(r#"{"alg":"ES256","typ":"JWT","kid":"key-01"}"#, "{}");
        assert_eq!(extract_kid(&token).unwrap(), "key-01");
    }

    #[test]
    fn test_extract_kid_missing_kid() {
        let token = token_with(r#"{"alg":"ES256","typ":"JWT"}"#, "{}");
        assert!(matches!(
            extract_kid(&token),
            Err(JwtValidationError::MissingKid)
        ));
    }

    #[test]
    fn test_extract_kid_rejects_empty_and_non_string() {
        for header in [
            r#"{"alg":"ES256","kid":""}"#,
            r#"{"alg":"ES256","kid":42}"#,
            r#"{"alg":"ES256","kid":null}"#,
        ] {
            let token = token_with(header, "{}");
            assert!(
                matches!(extract_kid(&token), Err(JwtValidationError::MissingKid)),
                "header {header} should be rejected"
            );
        }
    }

    #[test]
    fn test_extract_kid_malformed_structure() {
        for token in ["", "single", "only.two", "a.b.c.d"] {
            assert!(
                matches!(extract_kid(token), Err(JwtValidationError::MalformedToken)),
                "token {token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_extract_kid_invalid_base64_and_json() {
        assert!(matches!(
            extract_kid("!!!invalid!!!.payload.signature"),
            Err(JwtValidationError::MalformedToken)
        ));

        let header_b64 = URL_SAFE_NO_PAD.encode("not-json");
        let token = format!("{header_b64}.payload.signature");
        assert!(matches!(
            extract_kid(&token),
            Err(JwtValidationError::MalformedToken)
        ));
    }

    #[test]
    fn test_extract_kid_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert!(matches!(
            extract_kid(&oversized),
            Err(JwtValidationError::TokenTooLarge)
        ));
    }

    // -------------------------------------------------------------------------
    // extract_unverified_issuer Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_extract_issuer_valid_token() {
        let token = token_with(
            r#"{"alg":"ES256","kid":"k"}"#,
            r#"{"iss":"https://id.example.com/auth/v1","sub":"u1"}"#,
        );
        assert_eq!(
            extract_unverified_issuer(&token).unwrap(),
            "https://id.example.com/auth/v1"
        );
    }

    #[test]
    fn test_extract_issuer_missing() {
        let token = token_with(r#"{"alg":"ES256","kid":"k"}"#, r#"{"sub":"u1"}"#);
        assert!(matches!(
            extract_unverified_issuer(&token),
            Err(JwtValidationError::MissingIssuer)
        ));

        let token = token_with(r#"{"alg":"ES256","kid":"k"}"#, r#"{"iss":""}"#);
        assert!(matches!(
            extract_unverified_issuer(&token),
            Err(JwtValidationError::MissingIssuer)
        ));
    }

    #[test]
    fn test_extract_issuer_malformed_payload() {
        let header_b64 = URL_SAFE_NO_PAD.encode(r#"{"kid":"k"}"#);
        let token = format!("{header_b64}.%%%.signature");
        assert!(matches!(
            extract_unverified_issuer(&token),
            Err(JwtValidationError::MalformedToken)
        ));
    }

    // -------------------------------------------------------------------------
    // validate_iat Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_iat_current_and_past() {
        let now = chrono::Utc::now().timestamp();
        assert!(validate_iat(now, DEFAULT_CLOCK_SKEW).is_ok());
        assert!(validate_iat(now - 3600, DEFAULT_CLOCK_SKEW).is_ok());
    }

    #[test]
    fn test_validate_iat_far_future() {
        let far_future = chrono::Utc::now().timestamp() + 86400;
        assert!(matches!(
            validate_iat(far_future, DEFAULT_CLOCK_SKEW),
            Err(JwtValidationError::IatTooFarInFuture)
        ));
    }

    #[test]
    fn test_validate_iat_at_boundary_exact() {
        let now = 1_700_000_000_i64;

        // iat == now + skew is the last accepted value
        assert!(validate_iat_at(now + 300, DEFAULT_CLOCK_SKEW, now).is_ok());

        assert!(matches!(
            validate_iat_at(now + 301, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::IatTooFarInFuture)
        ));
    }

    // -------------------------------------------------------------------------
    // Key decoding Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_ed25519_public_key_jwk() {
        let raw = [7u8; 32];
        let encoded = URL_SAFE_NO_PAD.encode(raw);
        assert_eq!(decode_ed25519_public_key_jwk(&encoded).unwrap(), raw.to_vec());
    }

    #[test]
    fn test_decode_ed25519_public_key_jwk_invalid() {
        assert!(decode_ed25519_public_key_jwk("!!!not-base64!!!").is_err());
    }
}
