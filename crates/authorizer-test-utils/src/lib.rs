//! # Authorizer Test Utilities
//!
//! Shared test utilities for the authorizer.
//!
//! This crate provides:
//! - RSA signing keys with matching X.509 certificates (`crypto_fixtures`)
//! - A mock JWKS endpoint (`MockJwks`)
//! - Server test harness (`TestAuthorizerServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authorizer_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let jwks = MockJwks::start().await;
//!     jwks.serve_keys(&[&TestSigningKey::primary()]).await;
//!
//!     let server = TestAuthorizerServer::spawn(&jwks.jwks_url()).await?;
//!     let token = sign_token(&TestSigningKey::primary(), &serde_json::json!({"sub": "auth0|abc123"}));
//!
//!     let decision = server.authorize(Some(&format!("Bearer {token}"))).await?;
//!     assert_eq!(decision["principalId"], "auth0|abc123");
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_mock;
pub mod server_harness;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_mock::*;
pub use server_harness::*;
