//! Gate outcome: what to do with the request, plus the cookie writes that must
//! reach the browser whatever happens.

use crate::auth::claims::Claims;
use crate::session::cookies::{apply_mutations, CookieMutation, RequestCookie};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// What the gate decided for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Forward to the page handler.
    Continue,
    /// Send the browser elsewhere (path plus the original query string).
    Redirect(String),
}

/// Intent paired with the pending cookie mutations.
///
/// The mutations are private: the only way to get them onto a response is
/// [`GateOutcome::finalize`], which every response path goes through.
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub intent: Intent,
    pub claims: Option<Claims>,
    cookie_mutations: Vec<CookieMutation>,
}

impl GateOutcome {
    pub(crate) fn new(
        intent: Intent,
        claims: Option<Claims>,
        cookie_mutations: Vec<CookieMutation>,
    ) -> Self {
        Self {
            intent,
            claims,
            cookie_mutations,
        }
    }

    /// Number of pending cookie writes.
    pub fn mutation_count(&self) -> usize {
        self.cookie_mutations.len()
    }

    /// Write rotated cookie values into the forwarded request's cookie list.
    pub fn apply_to_request_cookies(&self, cookies: &mut Vec<RequestCookie>) {
        apply_mutations(cookies, &self.cookie_mutations);
    }

    /// Redirect response for a `Redirect` intent, `None` for `Continue`.
    ///
    /// Not finalized; pass the result through [`GateOutcome::finalize`].
    pub fn redirect_response(&self) -> Option<Response> {
        let Intent::Redirect(location) = &self.intent else {
            return None;
        };

        let response = match HeaderValue::from_str(location) {
            Ok(value) => (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, value)]).into_response(),
            Err(e) => {
                tracing::error!(target: "gate.gate", error = %e, "Redirect location is not a valid header value");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
        Some(response)
    }

    /// Attach every pending cookie mutation to `response`.
    pub fn finalize(self, mut response: Response) -> Response {
        let headers = response.headers_mut();
        for mutation in &self.cookie_mutations {
            match mutation.to_header_value() {
                Some(value) => {
                    headers.append(SET_COOKIE, value);
                }
                None => {
                    tracing::warn!(
                        target: "gate.gate",
                        cookie = %mutation.name,
                        "Dropping cookie mutation that cannot be rendered safely"
                    );
                }
            }
        }
        response
    }
}
