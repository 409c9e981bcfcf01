//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 signing keys, their JWK form, and token
//! signing. All fixtures are deterministic based on seed values.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::{json, Value};
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Ed25519 signing key as published by the identity service.
///
/// # Example
/// ```rust,ignore
/// let key = TestKeypair::from_seed(1, "key-1")?;
/// let token = key.sign(&TestTokenBuilder::new().for_user("u1").build())?;
/// ```
#[derive(Clone)]
pub struct TestKeypair {
    kid: String,
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl TestKeypair {
    /// Derive a keypair from `seed`. The same seed always yields the same key.
    pub fn from_seed(seed: u8, kid: &str) -> Result<Self, FixtureError> {
        let seed_bytes = seed_bytes(seed);

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
            .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e)))?;

        Ok(Self {
            kid: kid.to_string(),
            pkcs8: build_pkcs8_from_seed(&seed_bytes),
            public_key: key_pair.public_key().as_ref().to_vec(),
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Public key as an OKP JWK.
    pub fn jwk_json(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "kid": self.kid,
            "x": URL_SAFE_NO_PAD.encode(&self.public_key),
            "alg": "EdDSA",
            "use": "sig",
        })
    }

    /// Sign `claims` as an EdDSA JWT with this key's `kid`.
    pub fn sign(&self, claims: &Value) -> Result<String, FixtureError> {
        self.sign_with_kid(claims, &self.kid)
    }

    /// Sign `claims` with this key but label the token with another `kid`.
    ///
    /// Used to produce tokens whose signature does not match the published
    /// key for that `kid`.
    pub fn sign_with_kid(&self, claims: &Value, kid: &str) -> Result<String, FixtureError> {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &EncodingKey::from_ed_der(&self.pkcs8))
            .map_err(|e| FixtureError::Encoding(e.to_string()))
    }
}

/// JWKS document publishing `keys`.
pub fn jwks_json(keys: &[&TestKeypair]) -> Value {
    json!({ "keys": keys.iter().map(|k| k.jwk_json()).collect::<Vec<_>>() })
}

fn seed_bytes(seed: u8) -> [u8; 32] {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }
    seed_bytes
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// This is a test-only utility. Production code never handles signing keys.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    // SEQUENCE { version INTEGER 0, AlgorithmIdentifier { OID 1.3.101.112 },
    //            privateKey OCTET STRING { OCTET STRING seed } }
    let mut pkcs8 = Vec::with_capacity(48);

    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);

    pkcs8
}
