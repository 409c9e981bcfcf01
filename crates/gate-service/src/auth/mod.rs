//! Bearer-path authentication.
//!
//! - `claims`: the claims shape shared with the session path
//! - `jwks`: per-issuer signing key cache
//! - `jwt`: stateless token verification
//! - `hook_signature`: webhook HMAC verification

pub mod claims;
pub mod hook_signature;
pub mod jwks;
pub mod jwt;

pub use claims::Claims;
pub use jwks::{HttpKeySource, KeyProvider, KeySource};
pub use jwt::{parse_bearer, TokenVerifier};
