//! Stateless bearer-token verification.
//!
//! Reaches the same trust decision as the session gate from a bearer
//! credential alone, using public keys from the issuer's published key set.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (via `common::jwt`)
//! - The unverified `iss` must equal the configured issuer before any key is
//!   fetched, so a token cannot steer the gate to an arbitrary JWKS URL
//! - The algorithm is pinned by the key type of the selected JWK
//! - Expiry is checked without leeway; `iat` with clock skew tolerance
//! - Caller-facing messages are generic; detail is logged at debug level

use crate::auth::claims::{Claims, IdentityClaims};
use crate::auth::jwks::{Jwk, KeyProvider};
use crate::errors::GateError;
use crate::observability::metrics::record_token_verification;
use common::jwt::{decode_ed25519_public_key_jwk, extract_kid, extract_unverified_issuer, validate_iat};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

const GENERIC_INVALID: &str = "The access token is invalid or expired";

fn invalid() -> GateError {
    GateError::InvalidToken(GENERIC_INVALID.to_string())
}

/// Extract the token from an `Authorization` header value.
///
/// The value must split on whitespace into exactly two parts, the first of
/// which is `Bearer`.
///
/// # Errors
///
/// Returns `GateError::MissingCredential` for an absent or malformed header.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, GateError> {
    let header = header.ok_or(GateError::MissingCredential)?;

    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(GateError::MissingCredential),
    }
}

/// Verifies bearer tokens against the configured issuer's key set.
pub struct TokenVerifier {
    key_provider: Arc<KeyProvider>,
    issuer: String,
    audience: Option<String>,
    clock_skew: Duration,
}

impl TokenVerifier {
    /// Create a new verifier.
    ///
    /// # Arguments
    ///
    /// * `key_provider` - Shared key cache
    /// * `issuer` - Expected `iss`; also selects the key set
    /// * `audience` - Expected `aud`, or `None` to skip the audience check
    /// * `clock_skew` - Tolerance for `iat` in the future
    pub fn new(
        key_provider: Arc<KeyProvider>,
        issuer: String,
        audience: Option<String>,
        clock_skew: Duration,
    ) -> Self {
        Self {
            key_provider,
            issuer,
            audience,
            clock_skew,
        }
    }

    /// Verify a token and derive the caller's claims.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` - malformed token, foreign issuer, audience mismatch,
    ///   empty subject, `iat` too far in the future
    /// - `KeyFetch` - the signing key could not be obtained
    /// - `SignatureMismatch` - signature does not verify
    /// - `ExpiredToken` - `exp` is in the past
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Claims, GateError> {
        let result = self.verify_token(token).await;

        match &result {
            Ok(_) => {
                tracing::debug!(target: "gate.auth.jwt", "Token verified");
                record_token_verification("success");
            }
            Err(e) => {
                tracing::debug!(target: "gate.auth.jwt", reason = e.reason(), "Token rejected");
                record_token_verification(e.reason());
            }
        }

        result
    }

    async fn verify_token(&self, token: &str) -> Result<Claims, GateError> {
        let kid = extract_kid(token).map_err(|e| {
            tracing::debug!(target: "gate.auth.jwt", error = ?e, "Token kid extraction failed");
            invalid()
        })?;

        let issuer = extract_unverified_issuer(token).map_err(|e| {
            tracing::debug!(target: "gate.auth.jwt", error = ?e, "Token issuer extraction failed");
            invalid()
        })?;
        if issuer != self.issuer {
            tracing::debug!(target: "gate.auth.jwt", "Token issuer does not match configured issuer");
            return Err(invalid());
        }

        let jwk = self.key_provider.get_key(&issuer, &kid).await?;
        let (decoding_key, algorithm) = decoding_key_for(&jwk)?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let claims = decode::<IdentityClaims>(token, &decoding_key, &validation)
            .map_err(map_decode_error)?
            .claims;

        if let Some(iat) = claims.iat {
            validate_iat(iat, self.clock_skew).map_err(|e| {
                tracing::debug!(target: "gate.auth.jwt", error = ?e, "Token iat validation failed");
                invalid()
            })?;
        }

        if claims.sub.is_empty() {
            tracing::debug!(target: "gate.auth.jwt", "Token has empty subject");
            return Err(invalid());
        }

        Ok(claims.into_claims())
    }
}

/// Build the decoding key for a JWK, pinning the algorithm to its key type.
///
/// # Errors
///
/// Returns `GateError::InvalidToken` for unsupported key types, curves,
/// algorithms that disagree with the key type, or malformed key material.
pub(crate) fn decoding_key_for(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), GateError> {
    let algorithm = match (jwk.kty.as_str(), jwk.crv.as_deref()) {
        ("OKP", Some("Ed25519") | None) => Algorithm::EdDSA,
        ("EC", Some("P-256") | None) => Algorithm::ES256,
        ("RSA", _) => Algorithm::RS256,
        (kty, crv) => {
            tracing::warn!(target: "gate.auth.jwt", kty = %kty, crv = ?crv, "Unsupported JWK key type");
            return Err(invalid());
        }
    };

    if let Some(alg) = &jwk.alg {
        let expected = match algorithm {
            Algorithm::EdDSA => "EdDSA",
            Algorithm::ES256 => "ES256",
            _ => "RS256",
        };
        if alg != expected {
            tracing::warn!(target: "gate.auth.jwt", alg = %alg, kty = %jwk.kty, "JWK algorithm does not match key type");
            return Err(invalid());
        }
    }

    let missing = |member: &str| {
        tracing::error!(target: "gate.auth.jwt", kid = %jwk.kid, member = member, "JWK missing key material");
        invalid()
    };

    let key = match algorithm {
        Algorithm::EdDSA => {
            let x = jwk.x.as_deref().ok_or_else(|| missing("x"))?;
            let bytes = decode_ed25519_public_key_jwk(x).map_err(|e| {
                tracing::error!(target: "gate.auth.jwt", error = %e, "Invalid public key encoding");
                invalid()
            })?;
            DecodingKey::from_ed_der(&bytes)
        }
        Algorithm::ES256 => {
            let x = jwk.x.as_deref().ok_or_else(|| missing("x"))?;
            let y = jwk.y.as_deref().ok_or_else(|| missing("y"))?;
            DecodingKey::from_ec_components(x, y).map_err(|e| {
                tracing::error!(target: "gate.auth.jwt", error = %e, "Invalid EC key components");
                invalid()
            })?
        }
        _ => {
            let n = jwk.n.as_deref().ok_or_else(|| missing("n"))?;
            let e = jwk.e.as_deref().ok_or_else(|| missing("e"))?;
            DecodingKey::from_rsa_components(n, e).map_err(|e| {
                tracing::error!(target: "gate.auth.jwt", error = %e, "Invalid RSA key components");
                invalid()
            })?
        }
    };

    Ok((key, algorithm))
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> GateError {
    match e.kind() {
        ErrorKind::ExpiredSignature => GateError::ExpiredToken,
        ErrorKind::InvalidSignature => GateError::SignatureMismatch,
        kind => {
            tracing::debug!(target: "gate.auth.jwt", error = ?kind, "Token verification failed");
            invalid()
        }
    }
}
