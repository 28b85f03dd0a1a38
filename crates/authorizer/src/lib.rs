//! Bearer Token Authorizer Library
//!
//! Decides whether a caller presenting a bearer token may invoke a protected
//! API. Tokens are RS256-signed by an external identity provider; the
//! provider's published key set is fetched once and its first eligible
//! signing certificate is cached for the process lifetime.
//!
//! # Pipeline
//!
//! ```text
//! extractor -> certificate cache (jwks on first use) -> verifier -> policy
//! ```
//!
//! # Modules
//!
//! - `auth` - Header extraction, key set, certificate cache, token verification
//! - `config` - Service configuration from environment
//! - `errors` - Pipeline error taxonomy
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Authorizer event and probe response types
//! - `observability` - Prometheus metrics
//! - `policy` - Allow/deny decisions and the policy document
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod policy;
pub mod routes;
