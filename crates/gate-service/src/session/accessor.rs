//! Session accessor: derives claims from a request's cookies.
//!
//! Every failure on this path resolves to "unauthenticated". Cookie mutations
//! returned by the identity service are captured before any other decision is
//! made, so a redirect cannot drop a rotated session.

use crate::auth::claims::Claims;
use crate::session::cookies::{CookieMutation, RequestCookie};
use crate::session::identity::IdentityClient;
use std::sync::Arc;
use tracing::instrument;

/// Result of resolving a session.
#[derive(Debug, Clone, Default)]
pub struct SessionResolution {
    /// Claims derived in this request, if the session is valid.
    pub claims: Option<Claims>,

    /// Cookie writes to attach to the final response.
    pub cookie_mutations: Vec<CookieMutation>,
}

/// Resolves cookie-carried sessions through the identity service.
#[derive(Clone)]
pub struct SessionAccessor {
    identity: Arc<dyn IdentityClient>,
}

impl SessionAccessor {
    pub fn new(identity: Arc<dyn IdentityClient>) -> Self {
        Self { identity }
    }

    /// Resolve the session carried by `cookies`.
    ///
    /// Makes at most one identity call and never retries it.
    #[instrument(skip_all, fields(cookie_count = cookies.len()))]
    pub async fn resolve(&self, cookies: &[RequestCookie]) -> SessionResolution {
        if cookies.is_empty() {
            tracing::debug!(target: "gate.session", "No cookies, session is anonymous");
            return SessionResolution::default();
        }

        let response = match self.identity.claims_from_cookies(cookies).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(target: "gate.session", error = %e, "Session resolution failed, treating as anonymous");
                return SessionResolution::default();
            }
        };

        let cookie_mutations = response.set_cookies;
        let now = chrono::Utc::now().timestamp();

        let claims = response
            .claims
            .map(|identity_claims| identity_claims.into_claims())
            .filter(|claims| {
                if claims.subject.is_empty() {
                    tracing::warn!(target: "gate.session", "Session claims have empty subject, discarding");
                    return false;
                }
                if claims.is_expired_at(now) {
                    tracing::debug!(target: "gate.session", "Session claims already expired, discarding");
                    return false;
                }
                true
            });

        tracing::debug!(
            target: "gate.session",
            authenticated = claims.is_some(),
            mutation_count = cookie_mutations.len(),
            "Session resolved"
        );

        SessionResolution {
            claims,
            cookie_mutations,
        }
    }
}
