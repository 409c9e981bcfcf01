//! Secret types for values that must never reach a log line.
//!
//! Re-exports [`secrecy`] types. `SecretString` implements `Debug` with
//! redaction, so a config struct holding the identity API key or the auth-hook
//! secret can derive or hand-write `Debug` without leaking either value.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct IdentityCredentials {
//!     project_url: String,
//!     api_key: SecretString,
//! }
//!
//! let creds = IdentityCredentials {
//!     project_url: "https://id.example.com".to_string(),
//!     api_key: SecretString::from("anon-key"),
//! };
//!
//! // api_key is redacted in Debug output
//! assert!(!format!("{creds:?}").contains("anon-key"));
//!
//! // Reading the value is explicit
//! let key: &str = creds.api_key.expose_secret();
//! # assert_eq!(key, "anon-key");
//! ```
//!
//! Use `SecretString` for:
//! - identity-service API keys
//! - webhook signing secrets
//! - bearer tokens held beyond a single function call

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("hook-secret");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("hook-secret"));
    }

    #[test]
    fn test_expose_secret_returns_inner_value() {
        let secret = SecretString::from("anon-key-123");
        assert_eq!(secret.expose_secret(), "anon-key-123");
    }

    #[test]
    fn test_deserialize_keeps_value_hidden() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct HookSettings {
            name: String,
            secret: SecretString,
        }

        let json = r#"{"name": "user-created", "secret": "whsec-value"}"#;
        let settings: HookSettings = serde_json::from_str(json).expect("deserialize");

        assert_eq!(settings.secret.expose_secret(), "whsec-value");

        let debug = format!("{settings:?}");
        assert!(debug.contains("user-created"));
        assert!(!debug.contains("whsec-value"));
    }
}
