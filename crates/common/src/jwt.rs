//! JWT utilities shared across the authorizer crates.
//!
//! This module provides the structural checks that run before any
//! cryptographic work:
//! - Size limits for DoS prevention
//! - Clock skew constants for time-bound claim validation
//! - Segment shape checks (`header.payload.signature`)
//! - Unverified header inspection (`alg`, `kid`)
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Header inspection does NOT verify anything; the values it returns are
//!   only used to reject tokens early and to enrich diagnostics
//! - Error messages are generic; details go to debug logs
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{check_token_shape, inspect_header};
//!
//! check_token_shape(token)?;
//! let header = inspect_header(token)?;
//! if header.alg != "RS256" {
//!     return Err(...);
//! }
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any base64 decoding or
/// signature verification.
///
/// Identity-provider access tokens are typically 800-1500 bytes with an RS256
/// signature, so 8KB leaves ample room for custom claims.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (60 seconds).
///
/// Applied to `exp` and `nbf` checks to absorb clock drift between the
/// identity provider and this host.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// Prevents misconfiguration from accepting tokens long after expiry.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by the structural JWT checks.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token header has no usable `alg` field.
    #[error("The access token is invalid or expired")]
    MissingAlgorithm,
}

// =============================================================================
// Header Types
// =============================================================================

/// The unverified parts of a JWT header that callers care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedHeader {
    /// Algorithm advertised by the token (e.g. `RS256`).
    pub alg: String,

    /// Key ID, if the token names one.
    pub kid: Option<String>,
}

#[derive(Deserialize)]
struct RawHeader {
    #[serde(default)]
    alg: Option<serde_json::Value>,
    #[serde(default)]
    kid: Option<serde_json::Value>,
}

// =============================================================================
// Functions
// =============================================================================

/// Check that a token is within the size limit and has exactly three
/// non-empty dot-separated segments.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong segment count or an empty segment
pub fn check_token_shape(token: &str) -> Result<(), JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    if parts.iter().any(|part| part.is_empty()) {
        tracing::debug!(target: "common.jwt", "Token rejected: empty JWT segment");
        return Err(JwtValidationError::MalformedToken);
    }

    Ok(())
}

/// Decode the JWT header without verifying the signature.
///
/// Runs [`check_token_shape`] first, so oversized or mis-shaped tokens are
/// rejected before any decoding.
///
/// # Security
///
/// - This function does NOT validate the token signature
/// - The returned `alg` may only be used to reject tokens, never to select
///   a weaker verification path
///
/// # Errors
///
/// - `TokenTooLarge` / `MalformedToken` - from the shape check, or when the
///   header is not base64url-encoded JSON
/// - `MissingAlgorithm` - header has no `alg`, or `alg` is not a non-empty string
pub fn inspect_header(token: &str) -> Result<UnverifiedHeader, JwtValidationError> {
    check_token_shape(token)?;

    let header_part = token
        .split('.')
        .next()
        .ok_or(JwtValidationError::MalformedToken)?;

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: RawHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let alg = header
        .alg
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingAlgorithm)?;

    // A non-string kid is treated as absent; the key is never looked up by it
    let kid = header
        .kid
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    Ok(UnverifiedHeader { alg, kid })
}

// =============================================================================
// Tests
// =============================================================================
