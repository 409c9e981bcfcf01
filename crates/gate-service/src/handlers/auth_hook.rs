//! Identity-service "user created" webhook.
//!
//! Authenticated by an HMAC signature over the raw body rather than a bearer
//! token. Registers the new user in the user directory; repeated deliveries
//! are harmless.

use crate::auth::hook_signature::{verify_hook_signature, SIGNATURE_HEADER};
use crate::errors::GateError;
use crate::models::StatusResponse;
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use common::secret::ExposeSecret;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// User fields carried by the webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookUser {
    pub id: String,
    pub email: Option<String>,
}

/// Find the user object in a webhook payload.
///
/// Payload shapes differ between hook types, so the user is looked up in
/// `user`, `record`, `data.new`, `data`, then the root object; the first
/// candidate with a non-empty string `id` wins.
pub fn extract_user(payload: &Value) -> Option<HookUser> {
    let candidates = [
        payload.get("user"),
        payload.get("record"),
        payload.get("data").and_then(|d| d.get("new")),
        payload.get("data"),
        Some(payload),
    ];

    candidates.into_iter().flatten().find_map(|candidate| {
        let id = candidate.get("id")?.as_str().filter(|id| !id.is_empty())?;
        Some(HookUser {
            id: id.to_string(),
            email: candidate
                .get("email")
                .and_then(Value::as_str)
                .map(ToString::to_string),
        })
    })
}

/// Handler for POST /functions/v1/auth-user-created
#[instrument(skip_all, name = "gate.handlers.auth_hook")]
pub async fn auth_user_created(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StatusResponse>, GateError> {
    let Some(secret) = state.config.auth_hook_secret.as_ref() else {
        tracing::warn!(target: "gate.handlers.auth_hook", "Webhook called but AUTH_HOOK_SECRET is not configured");
        return Err(GateError::Unauthorized("invalid signature".to_string()));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    verify_hook_signature(secret.expose_secret().as_bytes(), &body, signature)?;

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|_| GateError::BadRequest("invalid json".to_string()))?;

    let user = extract_user(&payload)
        .ok_or_else(|| GateError::BadRequest("user not found in payload".to_string()))?;

    let created = state
        .user_directory
        .register(&user.id, user.email.as_deref())
        .await?;
    tracing::info!(target: "gate.handlers.auth_hook", created, "User registration processed");

    Ok(Json(StatusResponse::ok()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_user_from_known_shapes() {
        let shapes = [
            json!({"user": {"id": "u1", "email": "a@example.com"}}),
            json!({"record": {"id": "u1", "email": "a@example.com"}}),
            json!({"type": "INSERT", "data": {"new": {"id": "u1", "email": "a@example.com"}}}),
            json!({"data": {"id": "u1", "email": "a@example.com"}}),
            json!({"id": "u1", "email": "a@example.com"}),
        ];

        for payload in shapes {
            assert_eq!(
                extract_user(&payload),
                Some(HookUser {
                    id: "u1".to_string(),
                    email: Some("a@example.com".to_string()),
                }),
                "{payload}"
            );
        }
    }

    #[test]
    fn test_extract_user_prefers_earlier_candidates() {
        let payload = json!({"id": "root", "user": {"id": "nested"}});
        assert_eq!(extract_user(&payload).unwrap().id, "nested");
    }

    #[test]
    fn test_extract_user_skips_candidates_without_id() {
        let payload = json!({"user": {"email": "x"}, "record": {"id": ""}, "data": {"id": "u2"}});
        let user = extract_user(&payload).unwrap();
        assert_eq!(user.id, "u2");
        assert!(user.email.is_none());
    }

    #[test]
    fn test_extract_user_absent() {
        assert!(extract_user(&json!({"event": "signup"})).is_none());
        assert!(extract_user(&json!({"id": 42})).is_none());
        assert!(extract_user(&json!(null)).is_none());
    }
}
