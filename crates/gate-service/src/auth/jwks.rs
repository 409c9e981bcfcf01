//! Key provider: fetches and caches identity-service signing keys (JWKS).
//!
//! One key set is cached per issuer for the lifetime of the process. A set is
//! populated on first use and refreshed only when a lookup misses on a
//! specific key id, which is how key rotation is picked up without polling.
//!
//! # Concurrency
//!
//! Refreshes for one issuer are single-flight: callers that miss while a
//! refresh is running wait for it and share its outcome instead of issuing
//! their own fetch. A failed attempt is shared the same way, so an
//! unreachable identity service costs one fetch per burst of misses. Each
//! `get_key` call triggers at most one refresh.

use crate::errors::GateError;
use crate::observability::metrics::record_jwks_refresh;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Timeout for a single JWKS fetch.
const JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Path of the key set document relative to the issuer URL.
const JWKS_PATH: &str = "/.well-known/jwks.json";

/// JSON Web Key from a JWKS document.
///
/// Only the members needed for EdDSA, ES256 and RS256 verification are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("OKP", "EC" or "RSA").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Curve name ("Ed25519", "P-256").
    #[serde(default)]
    pub crv: Option<String>,

    /// OKP public key or EC x coordinate (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Declared algorithm.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig").
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// URL of the key set published by `issuer`.
pub fn jwks_url_for(issuer: &str) -> String {
    format!("{}{}", issuer.trim_end_matches('/'), JWKS_PATH)
}

/// Source of key set documents, injected into [`KeyProvider`].
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Fetch the current key set published by `issuer`.
    ///
    /// # Errors
    ///
    /// Returns `GateError::KeyFetch` if the document cannot be retrieved or parsed.
    async fn fetch_key_set(&self, issuer: &str) -> Result<JwksResponse, GateError>;
}

/// Key source that fetches `<issuer>/.well-known/jwks.json` over HTTP.
pub struct HttpKeySource {
    http_client: reqwest::Client,
}

impl HttpKeySource {
    /// Create a new HTTP key source.
    pub fn new() -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(JWKS_FETCH_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gate.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self { http_client }
    }
}

impl Default for HttpKeySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch_key_set(&self, issuer: &str) -> Result<JwksResponse, GateError> {
        let url = jwks_url_for(issuer);
        tracing::debug!(target: "gate.auth.jwks", url = %url, "Fetching JWKS");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            tracing::error!(target: "gate.auth.jwks", error = %e, url = %url, "Failed to fetch JWKS");
            GateError::KeyFetch(format!("JWKS endpoint unreachable: {}", url))
        })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "gate.auth.jwks",
                status = %response.status(),
                url = %url,
                "JWKS endpoint returned error"
            );
            return Err(GateError::KeyFetch(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        response.json::<JwksResponse>().await.map_err(|e| {
            tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to parse JWKS response");
            GateError::KeyFetch("JWKS response could not be parsed".to_string())
        })
    }
}

/// Cached key set for one issuer.
#[derive(Default)]
struct IssuerKeys {
    /// Map of key ID to JWK.
    keys: RwLock<HashMap<String, Jwk>>,

    /// Incremented after every completed refresh attempt, failed or not.
    attempts: AtomicU64,

    /// Held for the duration of a fetch; serializes refreshes. Guards the
    /// failure of the latest attempt so callers that waited on it share it.
    refresh_lock: Mutex<Option<String>>,
}

impl IssuerKeys {
    async fn lookup(&self, kid: &str) -> Option<Jwk> {
        self.keys.read().await.get(kid).cloned()
    }

    /// Refresh unless another caller completed an attempt after `observed`,
    /// in which case that attempt's outcome is returned.
    async fn refresh(
        &self,
        source: &dyn KeySource,
        issuer: &str,
        observed: u64,
    ) -> Result<(), GateError> {
        let mut last_failure = self.refresh_lock.lock().await;

        if self.attempts.load(Ordering::Acquire) != observed {
            tracing::debug!(target: "gate.auth.jwks", "JWKS refresh settled by concurrent caller");
            return match last_failure.as_ref() {
                Some(reason) => Err(GateError::KeyFetch(reason.clone())),
                None => Ok(()),
            };
        }

        let result = source.fetch_key_set(issuer).await;
        self.attempts.fetch_add(1, Ordering::AcqRel);

        let jwks = match result {
            Ok(jwks) => jwks,
            Err(e) => {
                let reason = match &e {
                    GateError::KeyFetch(reason) => reason.clone(),
                    other => other.to_string(),
                };
                *last_failure = Some(reason);
                record_jwks_refresh("error");
                return Err(e);
            }
        };

        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();

        tracing::info!(
            target: "gate.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        *self.keys.write().await = keys;
        *last_failure = None;
        record_jwks_refresh("success");

        Ok(())
    }
}

/// Process-wide cache of signing keys, one key set per issuer.
///
/// Owned explicitly and passed to the token verifier; tests construct it
/// with a fake [`KeySource`].
pub struct KeyProvider {
    source: Arc<dyn KeySource>,
    issuers: RwLock<HashMap<String, Arc<IssuerKeys>>>,
}

impl KeyProvider {
    /// Create a key provider backed by `source`.
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self {
            source,
            issuers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a key provider that fetches over HTTP.
    pub fn http() -> Self {
        Self::new(Arc::new(HttpKeySource::new()))
    }

    async fn issuer_entry(&self, issuer: &str) -> Arc<IssuerKeys> {
        if let Some(entry) = self.issuers.read().await.get(issuer) {
            return entry.clone();
        }

        self.issuers
            .write()
            .await
            .entry(issuer.to_string())
            .or_default()
            .clone()
    }

    /// Get the key `kid` published by `issuer`.
    ///
    /// Served from cache when present. On a miss the issuer's key set is
    /// refreshed once (coalesced with concurrent refreshes) and looked up
    /// again.
    ///
    /// # Errors
    ///
    /// Returns `GateError::KeyFetch` if the key set cannot be fetched or the
    /// key id is still absent after the refresh.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, issuer: &str, kid: &str) -> Result<Jwk, GateError> {
        let entry = self.issuer_entry(issuer).await;

        // Read the attempt count before the lookup so a refresh that lands in
        // between is not mistaken for one that predates our miss.
        let observed = entry.attempts.load(Ordering::Acquire);
        if let Some(key) = entry.lookup(kid).await {
            tracing::debug!(target: "gate.auth.jwks", "JWKS cache hit");
            return Ok(key);
        }

        tracing::debug!(target: "gate.auth.jwks", "JWKS cache miss, refreshing");
        entry.refresh(self.source.as_ref(), issuer, observed).await?;

        if let Some(key) = entry.lookup(kid).await {
            return Ok(key);
        }

        tracing::warn!(target: "gate.auth.jwks", "Key not found in JWKS after refresh");
        Err(GateError::KeyFetch(
            "Signing key is not published by the issuer".to_string(),
        ))
    }
}
