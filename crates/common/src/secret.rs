//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Use them for
//! bearer tokens and any other credential that passes through the authorizer.
//!
//! `SecretString` implements `Debug` with redaction, so any struct deriving
//! `Debug` that holds one gets safe logging behavior for free. Secrets are
//! zeroized when dropped.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Credential {
//!     scheme: &'static str,
//!     token: SecretString,
//! }
//!
//! let credential = Credential {
//!     scheme: "Bearer",
//!     token: SecretString::from("eyJhbGciOiJSUzI1NiJ9.e30.c2ln"),
//! };
//!
//! // Safe: the token is redacted
//! println!("{:?}", credential);
//!
//! // Reading the value is always explicit
//! let raw: &str = credential.token.expose_secret();
//! assert!(raw.starts_with("eyJ"));
//! ```

pub use secrecy::{ExposeSecret, SecretString};
