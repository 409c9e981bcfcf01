//! Builder patterns for test data construction
//!
//! Provides fluent APIs for identity-service claim sets. The same claim set
//! is used as a bearer token payload and as the `claims` object of a session
//! response.

use chrono::{Duration, Utc};
use serde_json::{json, Value};

/// Builder for identity-service claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_user("u1")
///     .issued_by(&identity.issuer())
///     .admin()
///     .build();
/// ```
pub struct TestTokenBuilder {
    sub: String,
    iss: Option<String>,
    aud: Option<String>,
    exp: i64,
    iat: i64,
    authority: Option<String>,
}

impl TestTokenBuilder {
    /// Create a new builder: random subject, valid for an hour.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: uuid::Uuid::new_v4().to_string(),
            iss: None,
            aud: None,
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            authority: None,
        }
    }

    /// Set the subject
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the issuer
    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.iss = Some(issuer.to_string());
        self
    }

    /// Set the audience
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.aud = Some(audience.to_string());
        self
    }

    /// Mark the caller as an admin
    pub fn admin(self) -> Self {
        self.with_authority("admin")
    }

    /// Set `app_metadata.user_authority_type`
    pub fn with_authority(mut self, authority: &str) -> Self {
        self.authority = Some(authority.to_string());
        self
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = json!({
            "sub": self.sub,
            "exp": self.exp,
            "iat": self.iat,
            "role": "authenticated",
        });

        if let Some(iss) = self.iss {
            claims["iss"] = json!(iss);
        }
        if let Some(aud) = self.aud {
            claims["aud"] = json!(aud);
        }
        if let Some(authority) = self.authority {
            claims["app_metadata"] = json!({ "user_authority_type": authority });
        }

        claims
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
