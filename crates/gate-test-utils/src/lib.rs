//! # Gate Test Utilities
//!
//! Shared test utilities for the gate service.
//!
//! This crate provides:
//! - Deterministic Ed25519 signing keys and JWKS documents
//! - Claim set builders for bearer tokens and session responses
//! - A `wiremock` identity service (JWKS + session claims)
//! - Server test harness (`TestGateServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gate_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let identity = MockIdentityService::start().await;
//!     let key = TestKeypair::from_seed(1, "key-1")?;
//!     identity.mount_jwks(&[&key], Some(1)).await;
//!
//!     let server = TestGateServer::spawn(&identity).await?;
//!     let token = key.sign(&TestTokenBuilder::new().issued_by(&identity.issuer()).build())?;
//!
//!     let response = server
//!         .client()
//!         .get(server.url_for("/functions/v1/me"))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod mock_identity;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use mock_identity::*;
pub use server_harness::*;
pub use token_builders::*;
