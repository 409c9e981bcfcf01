//! Gateway decision engine.
//!
//! For each navigation: resolve the session, classify the path, decide. The
//! session is always resolved first so rotated cookies are captured even when
//! the decision does not depend on claims.

pub mod outcome;
pub mod policy;

pub use outcome::{GateOutcome, Intent};
pub use policy::{classify, LandingPolicy, RoutePolicy};

use crate::auth::claims::Claims;
use crate::observability::metrics::record_gate_decision;
use crate::session::accessor::SessionAccessor;
use crate::session::cookies::RequestCookie;
use axum::http::Uri;
use policy::{ADMIN_LANDING_PATH, ADMIN_SIGN_IN_PATH, ROOT_PATH, SIGN_IN_PATH};
use tracing::instrument;

/// Per-request decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(&'static str),
}

impl Decision {
    fn label(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Redirect(_) => "redirect",
        }
    }
}

/// Decide a classified request. Privilege is read only from `claims`.
pub fn decide(policy: RoutePolicy, claims: Option<&Claims>) -> Decision {
    match (policy, claims) {
        (RoutePolicy::Public, _) => Decision::Allow,
        (RoutePolicy::LandingRedirect, _) => Decision::Redirect(SIGN_IN_PATH),
        (RoutePolicy::AuthOnlyForAdmin, Some(_)) => Decision::Redirect(ADMIN_LANDING_PATH),
        (RoutePolicy::AuthOnlyForAdmin, None) => Decision::Allow,
        (RoutePolicy::Protected, None) => Decision::Redirect(SIGN_IN_PATH),
        (RoutePolicy::Protected, Some(_)) => Decision::Allow,
        (RoutePolicy::Admin, None) => Decision::Redirect(ADMIN_SIGN_IN_PATH),
        (RoutePolicy::Admin, Some(claims)) if !claims.privileged => Decision::Redirect(ROOT_PATH),
        (RoutePolicy::Admin, Some(_)) => Decision::Allow,
    }
}

/// Redirect target with the original query string preserved.
fn redirect_location(target: &str, uri: &Uri) -> String {
    match uri.query() {
        Some(query) if !query.is_empty() => format!("{target}?{query}"),
        _ => target.to_string(),
    }
}

/// The session gate applied to every navigation.
#[derive(Clone)]
pub struct Gate {
    accessor: SessionAccessor,
    landing: LandingPolicy,
}

impl Gate {
    pub fn new(accessor: SessionAccessor, landing: LandingPolicy) -> Self {
        Self { accessor, landing }
    }

    pub fn landing_policy(&self) -> LandingPolicy {
        self.landing
    }

    /// Evaluate a navigation to `uri` carrying `cookies`.
    #[instrument(skip_all, fields(path = %uri.path()))]
    pub async fn evaluate(&self, uri: &Uri, cookies: &[RequestCookie]) -> GateOutcome {
        let resolution = self.accessor.resolve(cookies).await;

        let policy = classify(uri.path(), self.landing);
        let decision = decide(policy, resolution.claims.as_ref());

        tracing::debug!(
            target: "gate.gate",
            policy = policy.as_str(),
            decision = decision.label(),
            authenticated = resolution.claims.is_some(),
            "Navigation decided"
        );
        record_gate_decision(policy.as_str(), decision.label());

        let intent = match decision {
            Decision::Allow => Intent::Continue,
            Decision::Redirect(target) => Intent::Redirect(redirect_location(target, uri)),
        };

        GateOutcome::new(intent, resolution.claims, resolution.cookie_mutations)
    }
}
