//! Bearer token verification.
//!
//! # Components
//!
//! - `extractor` - Parses the `Authorization` header into a bearer token
//! - `jwks` - Fetches the identity provider's signing-key set
//! - `certificate` - Derives and caches the verification certificate
//! - `verifier` - Verifies token signature and claims
//! - `pipeline` - Runs the stages for one request and produces the decision

pub mod certificate;
pub mod claims;
pub mod extractor;
pub mod jwks;
pub mod pipeline;
pub mod verifier;

pub use certificate::{CertificateCache, VerificationCertificate};
pub use claims::IdentityClaims;
pub use extractor::{extract_bearer_token, BearerToken};
pub use jwks::{HttpKeySetFetcher, KeySetSource, SigningKey};
pub use pipeline::Authorizer;
pub use verifier::TokenVerifier;
