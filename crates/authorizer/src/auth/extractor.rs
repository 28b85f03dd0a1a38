//! Bearer token extraction from the raw `Authorization` header value.

use crate::errors::AuthError;
use common::secret::{ExposeSecret, SecretString};

/// Case-insensitive scheme prefix, including the separating space.
const BEARER_PREFIX: &str = "bearer ";

/// Raw signed token taken from an authorization header.
///
/// Wraps a `SecretString` so the token never shows up in `Debug` output
/// or logs.
#[derive(Debug, Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    /// The token string, for handing to the verifier.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Parse an authorization header value into a bearer token.
///
/// # Errors
///
/// - `MissingHeader` - header absent or empty
/// - `MalformedHeader` - scheme is not `Bearer`, the token is empty, or the
///   token contains whitespace
pub fn extract_bearer_token(raw_header: Option<&str>) -> Result<BearerToken, AuthError> {
    let raw_header = match raw_header {
        Some(value) if !value.is_empty() => value,
        _ => {
            tracing::debug!(target: "authz.extract", "Missing Authorization header");
            return Err(AuthError::MissingHeader);
        }
    };

    // `get` avoids slicing through a multi-byte character
    let has_bearer_scheme = raw_header
        .get(..BEARER_PREFIX.len())
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(BEARER_PREFIX));

    if !has_bearer_scheme {
        tracing::debug!(target: "authz.extract", "Authorization header is not a bearer credential");
        return Err(AuthError::MalformedHeader);
    }

    let token = raw_header
        .get(BEARER_PREFIX.len()..)
        .map(str::trim)
        .unwrap_or_default();

    if token.is_empty() || token.contains(char::is_whitespace) {
        tracing::debug!(target: "authz.extract", "Bearer credential is empty or contains whitespace");
        return Err(AuthError::MalformedHeader);
    }

    Ok(BearerToken(SecretString::from(token.to_string())))
}
