//! Gate service configuration.
//!
//! Configuration is loaded from environment variables. Secrets are held as
//! `SecretString` and redacted in Debug output.

use crate::gate::LandingPolicy;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path of the token issuer under the identity service URL.
pub const ISSUER_PATH: &str = "/auth/v1";

/// Path of the session-claims operation under the issuer.
pub const CLAIMS_PATH: &str = "/session/claims";

/// Path of public storage objects under the identity service URL.
pub const STORAGE_PUBLIC_PATH: &str = "/storage/v1/object/public";

/// Default graceful-shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Gate service configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Expected `iss` of bearer tokens; the key set is published under it.
    pub jwt_issuer: String,

    /// Expected `aud` of bearer tokens, if any.
    pub jwt_audience: Option<String>,

    /// Tolerance for `iat` in the future.
    pub jwt_clock_skew: Duration,

    /// Identity-service API key, sent as the `apikey` header.
    pub identity_api_key: SecretString,

    /// URL of the session-claims operation.
    pub identity_claims_url: String,

    /// Base URL of public image objects; `<base>/<bucket>/<path>`.
    pub storage_public_url: String,

    /// Treatment of `/`.
    pub landing_policy: LandingPolicy,

    /// Secret for the user-created webhook signature. Unset disables the hook.
    pub auth_hook_secret: Option<SecretString>,

    /// Graceful-shutdown drain period in seconds.
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("jwt_clock_skew", &self.jwt_clock_skew)
            .field("identity_api_key", &"[REDACTED]")
            .field("identity_claims_url", &self.identity_claims_url)
            .field("storage_public_url", &self.storage_public_url)
            .field("landing_policy", &self.landing_policy)
            .field(
                "auth_hook_secret",
                &self.auth_hook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid landing policy configuration: {0}")]
    InvalidLandingPolicy(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainSeconds(String),
}

/// Non-empty value of `name`, if set.
fn non_empty<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = non_empty(vars, "BIND_ADDRESS")
            .unwrap_or(DEFAULT_BIND_ADDRESS)
            .to_string();

        let jwt_issuer = match (non_empty(vars, "JWT_ISSUER"), non_empty(vars, "IDENTITY_URL")) {
            (Some(issuer), _) => issuer.trim_end_matches('/').to_string(),
            (None, Some(identity_url)) => {
                format!("{}{}", identity_url.trim_end_matches('/'), ISSUER_PATH)
            }
            (None, None) => return Err(ConfigError::MissingEnvVar("IDENTITY_URL".to_string())),
        };

        let jwt_audience = non_empty(vars, "JWT_AUDIENCE").map(ToString::to_string);

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidJwtClockSkew(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got 0".to_string(),
                ));
            }

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_CLOCK_SKEW
        };

        let identity_api_key = SecretString::from(
            non_empty(vars, "IDENTITY_API_KEY")
                .ok_or_else(|| ConfigError::MissingEnvVar("IDENTITY_API_KEY".to_string()))?,
        );

        let identity_claims_url = non_empty(vars, "IDENTITY_CLAIMS_URL")
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("{jwt_issuer}{CLAIMS_PATH}"));

        let storage_public_url = match non_empty(vars, "STORAGE_PUBLIC_URL") {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let identity_base = non_empty(vars, "IDENTITY_URL")
                    .map(|url| url.trim_end_matches('/'))
                    .unwrap_or_else(|| {
                        jwt_issuer
                            .strip_suffix(ISSUER_PATH)
                            .unwrap_or(jwt_issuer.as_str())
                    });
                format!("{identity_base}{STORAGE_PUBLIC_PATH}")
            }
        };

        let landing_policy = match vars.get("GATE_LANDING_POLICY") {
            Some(value) => value
                .parse::<LandingPolicy>()
                .map_err(|e| ConfigError::InvalidLandingPolicy(e.to_string()))?,
            None => LandingPolicy::default(),
        };

        let auth_hook_secret = non_empty(vars, "AUTH_HOOK_SECRET").map(SecretString::from);

        let drain_seconds = match vars.get("GATE_DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "GATE_DRAIN_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?,
            None => DEFAULT_DRAIN_SECONDS,
        };

        Ok(Config {
            bind_address,
            jwt_issuer,
            jwt_audience,
            jwt_clock_skew,
            identity_api_key,
            identity_claims_url,
            storage_public_url,
            landing_policy,
            auth_hook_secret,
            drain_seconds,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "IDENTITY_URL".to_string(),
                "https://project.identity.example.com".to_string(),
            ),
            ("IDENTITY_API_KEY".to_string(), "anon-key-123".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(
            config.jwt_issuer,
            "https://project.identity.example.com/auth/v1"
        );
        assert_eq!(
            config.identity_claims_url,
            "https://project.identity.example.com/auth/v1/session/claims"
        );
        assert!(config.jwt_audience.is_none());
        assert_eq!(config.jwt_clock_skew, DEFAULT_CLOCK_SKEW);
        assert_eq!(config.identity_api_key.expose_secret(), "anon-key-123");
        assert_eq!(
            config.storage_public_url,
            "https://project.identity.example.com/storage/v1/object/public"
        );
        assert_eq!(config.landing_policy, LandingPolicy::RedirectToSignIn);
        assert!(config.auth_hook_secret.is_none());
        assert_eq!(config.drain_seconds, DEFAULT_DRAIN_SECONDS);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert(
            "JWT_ISSUER".to_string(),
            "https://issuer.example.com/auth/v1/".to_string(),
        );
        vars.insert("JWT_AUDIENCE".to_string(), "authenticated".to_string());
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "120".to_string());
        vars.insert(
            "IDENTITY_CLAIMS_URL".to_string(),
            "https://claims.example.com/resolve".to_string(),
        );
        vars.insert("GATE_LANDING_POLICY".to_string(), "public".to_string());
        vars.insert("AUTH_HOOK_SECRET".to_string(), "whsec".to_string());
        vars.insert("GATE_DRAIN_SECONDS".to_string(), "0".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.jwt_issuer, "https://issuer.example.com/auth/v1");
        assert_eq!(config.jwt_audience.as_deref(), Some("authenticated"));
        assert_eq!(config.jwt_clock_skew, Duration::from_secs(120));
        assert_eq!(config.identity_claims_url, "https://claims.example.com/resolve");
        assert_eq!(config.landing_policy, LandingPolicy::Public);
        assert_eq!(
            config.auth_hook_secret.as_ref().unwrap().expose_secret(),
            "whsec"
        );
        assert_eq!(config.drain_seconds, 0);
    }

    #[test]
    fn test_issuer_alone_is_enough() {
        let vars = HashMap::from([
            (
                "JWT_ISSUER".to_string(),
                "https://issuer.example.com/auth/v1".to_string(),
            ),
            ("IDENTITY_API_KEY".to_string(), "k".to_string()),
        ]);

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(
            config.identity_claims_url,
            "https://issuer.example.com/auth/v1/session/claims"
        );
        assert_eq!(
            config.storage_public_url,
            "https://issuer.example.com/storage/v1/object/public"
        );
    }

    #[test]
    fn test_from_vars_missing_identity_url() {
        let mut vars = base_vars();
        vars.remove("IDENTITY_URL");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "IDENTITY_URL"));
    }

    #[test]
    fn test_from_vars_missing_api_key() {
        let mut vars = base_vars();
        vars.insert("IDENTITY_API_KEY".to_string(), "  ".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "IDENTITY_API_KEY"));
    }

    #[test]
    fn test_jwt_clock_skew_bounds() {
        for (value, ok) in [("0", false), ("-5", false), ("abc", false), ("1", true), ("600", true), ("601", false)] {
            let mut vars = base_vars();
            vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), value.to_string());

            let result = Config::from_vars(&vars);
            assert_eq!(result.is_ok(), ok, "JWT_CLOCK_SKEW_SECONDS={value}");
            if !ok {
                assert!(matches!(result, Err(ConfigError::InvalidJwtClockSkew(_))));
            }
        }
    }

    #[test]
    fn test_invalid_landing_policy() {
        let mut vars = base_vars();
        vars.insert("GATE_LANDING_POLICY".to_string(), "open".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidLandingPolicy(_))));
    }

    #[test]
    fn test_invalid_drain_seconds() {
        let mut vars = base_vars();
        vars.insert("GATE_DRAIN_SECONDS".to_string(), "soon".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidDrainSeconds(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut vars = base_vars();
        vars.insert("AUTH_HOOK_SECRET".to_string(), "whsec-value".to_string());

        let config = Config::from_vars(&vars).unwrap();
        let debug_output = format!("{:?}", config);

        assert!(!debug_output.contains("anon-key-123"));
        assert!(!debug_output.contains("whsec-value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("project.identity.example.com"));
    }
}
