//! Session-gate middleware for page navigations.
//!
//! Runs the gate on every request that reaches it. Redirects short-circuit;
//! allowed requests continue with the rotated session cookies and the claims
//! attached. Either way the response leaves through `GateOutcome::finalize`.

use crate::gate::policy::is_static_asset;
use crate::gate::Gate;
use crate::session::cookies::{parse_cookie_headers, render_cookie_header};
use axum::{
    extract::{Request, State},
    http::{header::COOKIE, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip_all, name = "gate.middleware.session_gate", fields(path = %req.uri().path()))]
pub async fn session_gate(State(gate): State<Arc<Gate>>, mut req: Request, next: Next) -> Response {
    if is_static_asset(req.uri().path()) {
        return next.run(req).await;
    }

    let mut cookies = parse_cookie_headers(req.headers());
    let outcome = gate.evaluate(req.uri(), &cookies).await;

    if let Some(redirect) = outcome.redirect_response() {
        return outcome.finalize(redirect);
    }

    if outcome.mutation_count() > 0 {
        outcome.apply_to_request_cookies(&mut cookies);
        let headers = req.headers_mut();
        if cookies.is_empty() {
            headers.remove(COOKIE);
        } else {
            match HeaderValue::from_str(&render_cookie_header(&cookies)) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(e) => {
                    tracing::warn!(target: "gate.middleware.session_gate", error = %e, "Could not forward rotated cookies");
                }
            }
        }
    }

    if let Some(claims) = outcome.claims.clone() {
        req.extensions_mut().insert(claims);
    }

    let response = next.run(req).await;
    outcome.finalize(response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::claims::{Claims, IdentityClaims};
    use crate::errors::GateError;
    use crate::gate::LandingPolicy;
    use crate::session::cookies::{CookieMutation, CookieOptions, RequestCookie};
    use crate::session::identity::{ClaimsResponse, IdentityClient};
    use crate::session::SessionAccessor;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{
            header::{LOCATION, SET_COOKIE},
            HeaderMap, StatusCode,
        },
        middleware, Extension, Router,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct FixedIdentity(ClaimsResponse);

    #[async_trait]
    impl IdentityClient for FixedIdentity {
        async fn claims_from_cookies(
            &self,
            _cookies: &[RequestCookie],
        ) -> Result<ClaimsResponse, GateError> {
            Ok(self.0.clone())
        }
    }

    fn session(sub: Option<&str>) -> ClaimsResponse {
        let claims = sub.map(|sub| {
            serde_json::from_value::<IdentityClaims>(serde_json::json!({
                "sub": sub,
                "exp": chrono::Utc::now().timestamp() + 3600,
            }))
            .unwrap()
        });
        ClaimsResponse {
            claims,
            set_cookies: vec![CookieMutation {
                name: "sb-auth-token".to_string(),
                value: "rotated".to_string(),
                options: CookieOptions {
                    path: Some("/".to_string()),
                    http_only: Some(true),
                    ..CookieOptions::default()
                },
            }],
        }
    }

    async fn echo(headers: HeaderMap, claims: Option<Extension<Claims>>) -> String {
        let cookie = headers
            .get(COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let subject = claims.map(|Extension(c)| c.subject).unwrap_or_default();
        format!("{subject}|{cookie}")
    }

    fn app(response: ClaimsResponse) -> Router {
        let gate = Arc::new(Gate::new(
            SessionAccessor::new(Arc::new(FixedIdentity(response))),
            LandingPolicy::default(),
        ));
        Router::new()
            .fallback(echo)
            .layer(middleware::from_fn_with_state(gate, session_gate))
    }

    fn navigation(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(uri)
            .header(COOKIE, "sb-auth-token=v1; theme=dark")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_continue_forwards_rotated_cookies_and_claims() {
        let response = app(session(Some("u1"))).oneshot(navigation("/record")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(SET_COOKIE).unwrap(),
            "sb-auth-token=rotated; Path=/; HttpOnly"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "u1|sb-auth-token=rotated; theme=dark");
    }

    #[tokio::test]
    async fn test_redirect_carries_cookie_mutations() {
        let response = app(session(None)).oneshot(navigation("/record?d=1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/auth/sign-in?d=1");
        assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 1);
    }

    #[tokio::test]
    async fn test_static_assets_bypass_gate() {
        let response = app(session(None)).oneshot(navigation("/logo.png")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }
}
