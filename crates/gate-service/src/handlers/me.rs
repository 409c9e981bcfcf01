//! Current caller handler.

use crate::auth::Claims;
use crate::models::MeResponse;
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET /functions/v1/me
///
/// Returns the claims verified by the bearer middleware.
///
/// ```json
/// {"subject": "3f1c...", "privileged": false, "expires_at": 1700003600}
/// ```
#[instrument(skip_all, name = "gate.handlers.me")]
pub async fn get_me(Extension(claims): Extension<Claims>) -> Json<MeResponse> {
    tracing::debug!(target: "gate.handlers.me", "Returning caller claims");

    Json(MeResponse {
        subject: claims.subject,
        privileged: claims.privileged,
        expires_at: claims.expires_at,
    })
}
