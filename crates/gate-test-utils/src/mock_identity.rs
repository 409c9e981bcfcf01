//! Mock identity service
//!
//! A `wiremock` server standing in for the identity service: the issuer's
//! JWKS document and the session-claims operation.

use crate::crypto_fixtures::{jwks_json, TestKeypair};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the issuer on the mock server.
pub const ISSUER_PATH: &str = "/auth/v1";

/// Path of the JWKS document on the mock server.
pub const JWKS_PATH: &str = "/auth/v1/.well-known/jwks.json";

/// Path of the session-claims operation on the mock server.
pub const CLAIMS_PATH: &str = "/auth/v1/session/claims";

/// API key the test gate is configured with.
pub const TEST_API_KEY: &str = "test-anon-key";

/// Name of the session cookie used in tests.
pub const SESSION_COOKIE: &str = "sb-test-auth-token";

pub struct MockIdentityService {
    server: MockServer,
}

impl MockIdentityService {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL, used as `IDENTITY_URL`.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Expected `iss` of tokens issued by this service.
    pub fn issuer(&self) -> String {
        format!("{}{}", self.server.uri(), ISSUER_PATH)
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Publish `keys`. With `expected_fetches`, the mock verifies on drop that
    /// the document was fetched exactly that many times.
    pub async fn mount_jwks(&self, keys: &[&TestKeypair], expected_fetches: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json(keys)));

        match expected_fetches {
            Some(n) => mock.expect(n).mount(&self.server).await,
            None => mock.mount(&self.server).await,
        }
    }

    /// Publish `keys` for the next fetch only. Later fetches fall through to
    /// mocks mounted afterwards.
    pub async fn mount_jwks_once(&self, keys: &[&TestKeypair]) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json(keys)))
            .up_to_n_times(1)
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Resolve requests carrying `cookie_value` to `claims`, asking the gate
    /// to write `set_cookies`.
    pub async fn mount_session(&self, cookie_value: &str, claims: Option<Value>, set_cookies: Value) {
        Mock::given(method("POST"))
            .and(path(CLAIMS_PATH))
            .and(header("apikey", TEST_API_KEY))
            .and(body_string_contains(cookie_value))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "claims": claims,
                "set_cookies": set_cookies,
            })))
            .mount(&self.server)
            .await;
    }

    /// Fail every claims request with `status`.
    pub async fn mount_claims_failure(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(CLAIMS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Assert the claims operation is called exactly `n` times.
    pub async fn expect_claims_calls(&self, n: u64) {
        Mock::given(method("POST"))
            .and(path(CLAIMS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "claims": null,
                "set_cookies": [],
            })))
            .with_priority(u8::MAX)
            .expect(n)
            .mount(&self.server)
            .await;
    }
}

/// A `set_cookies` entry rotating the session cookie to `value`.
pub fn rotated_session_cookie(value: &str) -> Value {
    json!({
        "name": SESSION_COOKIE,
        "value": value,
        "options": {
            "path": "/",
            "httpOnly": true,
            "secure": true,
            "sameSite": "lax",
            "maxAge": 3600,
        },
    })
}
