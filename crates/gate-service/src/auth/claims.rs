//! Claims shared by both trust paths.
//!
//! The bearer verifier and the session accessor each derive a [`Claims`]
//! value independently; nothing else in the gate produces one. The subject is
//! redacted in Debug output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of `app_metadata.user_authority_type` that marks a privileged caller.
pub const ADMIN_AUTHORITY: &str = "admin";

/// Verified facts about the caller, derived in the current request.
#[derive(Clone, PartialEq, Eq)]
pub struct Claims {
    /// Stable subject identifier (identity-service user id).
    pub subject: String,

    /// Whether the caller carries the admin role marker.
    pub privileged: bool,

    /// Expiration timestamp (Unix epoch seconds).
    pub expires_at: i64,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("subject", &"[REDACTED]")
            .field("privileged", &self.privileged)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Claims {
    /// True once `now` has reached the expiry.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// Application metadata attached by the identity service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Role marker; `"admin"` grants access to admin routes.
    #[serde(default)]
    pub user_authority_type: Option<String>,
}

/// Claim set as issued by the identity service.
///
/// Appears as a JWT payload on the bearer path and as the `claims` object of
/// the session-claims response on the cookie path. Unknown fields are ignored.
#[derive(Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject (user id) - redacted in Debug output.
    #[serde(default)]
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Role-bearing application metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_metadata: Option<AppMetadata>,
}

impl fmt::Debug for IdentityClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityClaims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("iss", &self.iss)
            .field("app_metadata", &self.app_metadata)
            .finish()
    }
}

impl IdentityClaims {
    /// Whether the role marker grants admin privileges.
    pub fn is_privileged(&self) -> bool {
        self.app_metadata
            .as_ref()
            .and_then(|m| m.user_authority_type.as_deref())
            == Some(ADMIN_AUTHORITY)
    }

    /// Convert to the gate's claims shape.
    pub fn into_claims(self) -> Claims {
        let privileged = self.is_privileged();
        Claims {
            subject: self.sub,
            privileged,
            expires_at: self.exp,
        }
    }
}
