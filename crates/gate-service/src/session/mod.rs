//! Cookie-path session resolution.

pub mod accessor;
pub mod cookies;
pub mod identity;

pub use accessor::{SessionAccessor, SessionResolution};
pub use cookies::{CookieMutation, CookieOptions, RequestCookie, SameSite};
pub use identity::{ClaimsResponse, HttpIdentityClient, IdentityClient};
