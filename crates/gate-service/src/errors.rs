//! Gate error types.
//!
//! Bearer-path failures map to `401` with a machine-readable reason in the
//! body and in the `x-auth-diagnostic` header. Cookie-path failures never
//! reach this type's `IntoResponse`: the session accessor absorbs them into
//! "unauthenticated".

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Header carrying the short failure reason for operators.
pub const DIAGNOSTIC_HEADER: &str = "x-auth-diagnostic";

/// Gate error type.
///
/// Maps to HTTP status codes:
/// - MissingCredential, InvalidToken, ExpiredToken, SignatureMismatch,
///   KeyFetch, Unauthorized: 401 Unauthorized
/// - BadRequest: 400 Bad Request
/// - IdentityServiceUnavailable: 503 Service Unavailable
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Missing or malformed bearer credential")]
    MissingCredential,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Token signature mismatch")]
    SignatureMismatch,

    #[error("Key fetch failed: {0}")]
    KeyFetch(String),

    #[error("Identity service unavailable: {0}")]
    IdentityServiceUnavailable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal,
}

impl GateError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GateError::MissingCredential
            | GateError::InvalidToken(_)
            | GateError::ExpiredToken
            | GateError::SignatureMismatch
            | GateError::KeyFetch(_)
            | GateError::Unauthorized(_) => 401,
            GateError::BadRequest(_) => 400,
            GateError::IdentityServiceUnavailable(_) => 503,
            GateError::Internal => 500,
        }
    }

    /// Machine-readable reason, used as the response body, the diagnostic
    /// header and the metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            GateError::MissingCredential => "missing_credential",
            GateError::InvalidToken(_) => "invalid_token",
            GateError::ExpiredToken => "expired_token",
            GateError::SignatureMismatch => "signature_mismatch",
            GateError::KeyFetch(_) => "key_fetch_error",
            GateError::IdentityServiceUnavailable(_) => "identity_service_unavailable",
            GateError::Unauthorized(_) => "unauthorized",
            GateError::BadRequest(_) => "bad_request",
            GateError::Internal => "internal_error",
        }
    }

    /// True for failures of the bearer-token verification path.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            GateError::MissingCredential
                | GateError::InvalidToken(_)
                | GateError::ExpiredToken
                | GateError::SignatureMismatch
                | GateError::KeyFetch(_)
        )
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            GateError::KeyFetch(detail) => {
                // Operational problem rather than a bad credential
                tracing::error!(target: "gate.auth", error = %detail, "Signing key unavailable");
                (StatusCode::UNAUTHORIZED, self.reason().to_string())
            }
            GateError::MissingCredential
            | GateError::InvalidToken(_)
            | GateError::ExpiredToken
            | GateError::SignatureMismatch => (StatusCode::UNAUTHORIZED, self.reason().to_string()),
            GateError::Unauthorized(reason) => (StatusCode::UNAUTHORIZED, reason.clone()),
            GateError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            GateError::IdentityServiceUnavailable(detail) => {
                tracing::warn!(target: "gate.availability", error = %detail, "Identity service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable".to_string(),
                )
            }
            GateError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            ),
        };

        let mut response = (status, Json(ErrorResponse { error: message })).into_response();

        if self.is_credential_failure() {
            let headers = response.headers_mut();
            headers.insert(DIAGNOSTIC_HEADER, HeaderValue::from_static(self.reason()));

            let challenge = if matches!(self, GateError::MissingCredential) {
                HeaderValue::from_static("Bearer realm=\"meal-log\"")
            } else {
                HeaderValue::from_static("Bearer realm=\"meal-log\", error=\"invalid_token\"")
            };
            headers.insert("WWW-Authenticate", challenge);
        }

        response
    }
}
