//! Bearer authentication middleware for function endpoints.
//!
//! Extracts the bearer token from the Authorization header, verifies it with
//! the token verifier, and injects the claims into request extensions.

use crate::auth::{parse_bearer, TokenVerifier};
use crate::errors::GateError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the bearer middleware.
#[derive(Clone)]
pub struct AuthState {
    pub token_verifier: Arc<TokenVerifier>,
}

/// Require a valid bearer token.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - 401 with `{"error": <reason>}`, `x-auth-diagnostic` and
///   `WWW-Authenticate` if the token is missing or fails verification
/// - Otherwise continues with [`crate::auth::Claims`] in extensions
#[instrument(skip_all, name = "gate.middleware.auth")]
pub async fn require_bearer(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, GateError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = parse_bearer(header).inspect_err(|_| {
        tracing::debug!(target: "gate.middleware.auth", "Missing or malformed Authorization header");
    })?;

    let claims = state.token_verifier.verify(token).await?;
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
