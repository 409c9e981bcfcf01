//! Route classification.
//!
//! Maps a request path to the policy that governs it. Matching works on
//! normalized path segments, so `/admin/../record`, `/admin//lessons` and
//! `/%2e%2e/admin` classify the same way a browser would resolve them, and
//! `/administrator` does not match the `/admin` prefix.

use std::fmt;
use std::str::FromStr;

/// Where unauthenticated callers are sent.
pub const SIGN_IN_PATH: &str = "/auth/sign-in";

/// Where admin-area callers without a session are sent.
pub const ADMIN_SIGN_IN_PATH: &str = "/admin/sign-in";

/// Where signed-in callers visiting admin sign-in/sign-up are sent.
pub const ADMIN_LANDING_PATH: &str = "/admin/lessons";

/// Where non-admins visiting the admin area are sent.
pub const ROOT_PATH: &str = "/";

/// Policy governing a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePolicy {
    /// No session required.
    Public,
    /// The landing page redirects to sign-in.
    LandingRedirect,
    /// Admin sign-in/sign-up; signed-in callers are sent on to the admin area.
    AuthOnlyForAdmin,
    /// Requires a session.
    Protected,
    /// Requires a privileged session.
    Admin,
}

impl RoutePolicy {
    /// Metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            RoutePolicy::Public => "public",
            RoutePolicy::LandingRedirect => "landing_redirect",
            RoutePolicy::AuthOnlyForAdmin => "auth_only_for_admin",
            RoutePolicy::Protected => "protected",
            RoutePolicy::Admin => "admin",
        }
    }
}

/// Treatment of the landing page (`/`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LandingPolicy {
    /// Everyone visiting `/` is sent to sign-in.
    #[default]
    RedirectToSignIn,
    /// `/` is public.
    Public,
}

/// Error parsing a [`LandingPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLandingPolicy(pub String);

impl fmt::Display for UnknownLandingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown landing policy '{}', expected 'redirect-to-sign-in' or 'public'",
            self.0
        )
    }
}

impl std::error::Error for UnknownLandingPolicy {}

impl FromStr for LandingPolicy {
    type Err = UnknownLandingPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redirect-to-sign-in" => Ok(LandingPolicy::RedirectToSignIn),
            "public" => Ok(LandingPolicy::Public),
            _ => Err(UnknownLandingPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for LandingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LandingPolicy::RedirectToSignIn => f.write_str("redirect-to-sign-in"),
            LandingPolicy::Public => f.write_str("public"),
        }
    }
}

fn is_current_segment(segment: &str) -> bool {
    segment == "." || segment.eq_ignore_ascii_case("%2e")
}

fn is_parent_segment(segment: &str) -> bool {
    matches!(
        segment.to_ascii_lowercase().as_str(),
        ".." | ".%2e" | "%2e." | "%2e%2e"
    )
}

/// Split a path into segments with dot segments resolved and empty segments
/// removed. `..` at the root stays at the root.
pub fn normalized_segments(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        if segment.is_empty() || is_current_segment(segment) {
            continue;
        }
        if is_parent_segment(segment) {
            segments.pop();
            continue;
        }
        segments.push(segment);
    }
    segments
}

/// Classify `path` under `landing`.
pub fn classify(path: &str, landing: LandingPolicy) -> RoutePolicy {
    let segments = normalized_segments(path);

    match segments.as_slice() {
        [] => match landing {
            LandingPolicy::RedirectToSignIn => RoutePolicy::LandingRedirect,
            LandingPolicy::Public => RoutePolicy::Public,
        },
        ["auth", ..] | ["legal", ..] => RoutePolicy::Public,
        ["admin"] => RoutePolicy::Public,
        ["admin", "sign-in" | "sign-up", ..] => RoutePolicy::AuthOnlyForAdmin,
        ["admin", ..] => RoutePolicy::Admin,
        _ => RoutePolicy::Protected,
    }
}

const ASSET_EXTENSIONS: [&str; 6] = ["svg", "png", "jpg", "jpeg", "gif", "webp"];

/// Static assets that are served without consulting the gate.
///
/// Image extensions never bypass the gate under `/admin`.
pub fn is_static_asset(path: &str) -> bool {
    let segments = normalized_segments(path);

    match segments.as_slice() {
        ["_next", "static" | "image", ..] | ["favicon.ico"] => true,
        ["admin", ..] => false,
        [.., last] => last
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ASSET_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a))),
        [] => false,
    }
}
