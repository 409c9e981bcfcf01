//! Middleware for the gate service.
//!
//! # Components
//!
//! - `auth` - Bearer authentication for function endpoints
//! - `session_gate` - Cookie-session gate for page navigations
//! - `http_metrics` - HTTP request metrics

pub mod auth;
pub mod http_metrics;
pub mod session_gate;

pub use auth::{require_bearer, AuthState};
pub use http_metrics::http_metrics_middleware;
pub use session_gate::session_gate;
