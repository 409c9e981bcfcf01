//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - checks that the gate can verify anything

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler. Checks no dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Readiness probe handler.
///
/// Returns 200 if the issuer and the claims endpoint are usable URLs, 503
/// otherwise. Keys are fetched on demand, so the identity service is not
/// contacted here.
#[tracing::instrument(skip_all, name = "gate.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = &state.config;

    if !is_http_url(&config.jwt_issuer) || !is_http_url(&config.identity_claims_url) {
        tracing::warn!(target: "gate.handlers.health", "Readiness check failed: identity endpoints misconfigured");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            error: None,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_returns_ok() {
        assert_eq!(health_check().await, "OK");
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://id.example.com/auth/v1"));
        assert!(is_http_url("http://127.0.0.1:9999/auth/v1"));
        assert!(!is_http_url("id.example.com"));
        assert!(!is_http_url(""));
    }
}
