//! Identity-service client for the "get claims from cookies" operation.
//!
//! # Wire format
//!
//! Request: `POST <claims_url>` with header `apikey` and body
//! `{"cookies": [{"name": ..., "value": ...}]}`.
//!
//! Response: `{"claims": {...} | null, "set_cookies": [{"name", "value", "options"}]}`.

use crate::auth::claims::IdentityClaims;
use crate::errors::GateError;
use crate::observability::metrics::record_identity_request;
use crate::session::cookies::{CookieMutation, RequestCookie};
use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::{Duration, Instant};
use tracing::{instrument, warn};

/// Timeout for a claims request in seconds.
const IDENTITY_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Serialize)]
struct ClaimsRequest<'a> {
    cookies: &'a [RequestCookie],
}

/// Result of the claims operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimsResponse {
    /// Session claims, or `None` if the cookies carry no valid session.
    ///
    /// A claims object that does not parse also counts as no session, so it
    /// cannot take the cookie writes down with it.
    #[serde(default, deserialize_with = "claims_or_none")]
    pub claims: Option<IdentityClaims>,

    /// Cookie writes the identity service wants on the response.
    #[serde(default)]
    pub set_cookies: Vec<CookieMutation>,
}

fn claims_or_none<'de, D>(deserializer: D) -> Result<Option<IdentityClaims>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };

    match serde_json::from_value::<IdentityClaims>(value) {
        Ok(claims) => Ok(Some(claims)),
        Err(e) => {
            warn!(target: "gate.session.identity", error = %e, "Malformed session claims, treating as no session");
            Ok(None)
        }
    }
}

/// The identity service, as seen by the session accessor.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Resolve the session carried by `cookies`.
    ///
    /// # Errors
    ///
    /// Returns `GateError::IdentityServiceUnavailable` on transport failure,
    /// non-2xx status or an unparsable body.
    async fn claims_from_cookies(
        &self,
        cookies: &[RequestCookie],
    ) -> Result<ClaimsResponse, GateError>;
}

/// HTTP implementation of [`IdentityClient`].
#[derive(Clone)]
pub struct HttpIdentityClient {
    client: Client,
    claims_url: String,
    api_key: SecretString,
}

impl HttpIdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns `GateError::Internal` if the HTTP client cannot be built.
    pub fn new(claims_url: String, api_key: SecretString) -> Result<Self, GateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(IDENTITY_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                tracing::error!(target: "gate.session.identity", error = %e, "Failed to build HTTP client");
                GateError::Internal
            })?;

        Ok(Self {
            client,
            claims_url,
            api_key,
        })
    }

    async fn request_claims(
        &self,
        cookies: &[RequestCookie],
    ) -> Result<ClaimsResponse, GateError> {
        let response = self
            .client
            .post(&self.claims_url)
            .header("apikey", self.api_key.expose_secret())
            .json(&ClaimsRequest { cookies })
            .send()
            .await
            .map_err(|e| {
                warn!(target: "gate.session.identity", error = %e, "Identity request failed");
                GateError::IdentityServiceUnavailable("identity service unreachable".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: "gate.session.identity", status = %status, "Identity service returned error");
            return Err(GateError::IdentityServiceUnavailable(format!(
                "identity service returned {status}"
            )));
        }

        response.json::<ClaimsResponse>().await.map_err(|e| {
            warn!(target: "gate.session.identity", error = %e, "Failed to parse identity response");
            GateError::IdentityServiceUnavailable("identity response could not be parsed".to_string())
        })
    }
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    #[instrument(skip_all, fields(cookie_count = cookies.len()))]
    async fn claims_from_cookies(
        &self,
        cookies: &[RequestCookie],
    ) -> Result<ClaimsResponse, GateError> {
        let start = Instant::now();
        let result = self.request_claims(cookies).await;
        let status = if result.is_ok() { "success" } else { "error" };
        record_identity_request(status, start.elapsed());
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpIdentityClient {
        HttpIdentityClient::new(
            format!("{}/auth/v1/session/claims", server.uri()),
            SecretString::from("anon-key"),
        )
        .unwrap()
    }

    #[test]
    fn test_claims_response_deserialization() {
        let json = r#"{
            "claims": {"sub": "u1", "exp": 1700000000, "app_metadata": {"user_authority_type": "admin"}},
            "set_cookies": [{"name": "sb-auth-token", "value": "v2", "options": {"path": "/"}}]
        }"#;

        let response: ClaimsResponse = serde_json::from_str(json).unwrap();

        let claims = response.claims.unwrap();
        assert_eq!(claims.sub, "u1");
        assert!(claims.is_privileged());
        assert_eq!(response.set_cookies.len(), 1);
    }

    #[test]
    fn test_claims_response_null_claims_and_missing_cookies() {
        let response: ClaimsResponse = serde_json::from_str(r#"{"claims": null}"#).unwrap();
        assert!(response.claims.is_none());
        assert!(response.set_cookies.is_empty());
    }

    #[test]
    fn test_malformed_claims_keep_set_cookies() {
        for claims in [
            serde_json::json!({"sub": "u1"}),
            serde_json::json!({"sub": 42, "exp": 4102444800_i64}),
            serde_json::json!("not-an-object"),
        ] {
            let response: ClaimsResponse = serde_json::from_value(serde_json::json!({
                "claims": claims,
                "set_cookies": [{"name": "sb-auth-token", "value": "rotated", "options": {"path": "/"}}]
            }))
            .unwrap();

            assert!(response.claims.is_none(), "{claims}");
            assert_eq!(response.set_cookies.len(), 1, "{claims}");
        }
    }

    #[tokio::test]
    async fn test_sends_cookies_and_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/session/claims"))
            .and(header("apikey", "anon-key"))
            .and(body_json(serde_json::json!({
                "cookies": [{"name": "sb-auth-token", "value": "v1"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "claims": {"sub": "u1", "exp": 4102444800_i64},
                "set_cookies": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .claims_from_cookies(&[RequestCookie::new("sb-auth-token", "v1")])
            .await
            .unwrap();

        assert_eq!(response.claims.unwrap().sub, "u1");
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .claims_from_cookies(&[RequestCookie::new("a", "1")])
            .await;

        assert!(matches!(result, Err(GateError::IdentityServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unparsable_body_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .claims_from_cookies(&[RequestCookie::new("a", "1")])
            .await;

        assert!(matches!(result, Err(GateError::IdentityServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_is_unavailable() {
        let client = HttpIdentityClient::new(
            "http://127.0.0.1:1/auth/v1/session/claims".to_string(),
            SecretString::from("anon-key"),
        )
        .unwrap();

        let result = client.claims_from_cookies(&[RequestCookie::new("a", "1")]).await;

        assert!(matches!(result, Err(GateError::IdentityServiceUnavailable(_))));
    }
}
