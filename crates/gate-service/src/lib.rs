//! Gate Service Library
//!
//! Request authentication and authorization gateway for the meal-log app.
//! Two independent trust paths produce the same [`auth::Claims`] shape:
//!
//! - Session gate: page navigations carry identity-service session cookies;
//!   claims are resolved per request and a route policy decides whether to
//!   continue or redirect. Rotated cookies always reach the browser.
//! - Bearer verifier: function endpoints carry a signed access token,
//!   verified locally against the issuer's published keys.
//!
//! # Modules
//!
//! - `auth` - Claims, key cache, bearer verification, webhook signatures
//! - `config` - Service configuration
//! - `errors` - Error types
//! - `gate` - Route classification and redirect decisions
//! - `handlers` - HTTP request handlers
//! - `middleware` - Bearer, session-gate and metrics middleware
//! - `models` - Request/response models
//! - `observability` - Prometheus metrics
//! - `routes` - Router and application state
//! - `services` - Record store and user directory
//! - `session` - Cookie parsing and identity-service session resolution

pub mod auth;
pub mod config;
pub mod errors;
pub mod gate;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod session;
