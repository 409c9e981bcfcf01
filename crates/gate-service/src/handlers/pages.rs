//! Stand-in for the page renderer behind the session gate.
//!
//! Navigations the gate allows land here. The response reports what the page
//! renderer would receive: the path and the claims the gate attached.

use crate::auth::Claims;
use axum::http::Uri;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse {
    pub path: String,
    pub authenticated: bool,
    pub privileged: bool,
}

pub async fn render_page(uri: Uri, claims: Option<Extension<Claims>>) -> Json<PageResponse> {
    let claims = claims.map(|Extension(claims)| claims);

    Json(PageResponse {
        path: uri.path().to_string(),
        authenticated: claims.is_some(),
        privileged: claims.is_some_and(|c| c.privileged),
    })
}
