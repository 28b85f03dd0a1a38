//! Authorizer error types.
//!
//! Every stage of the verification pipeline returns `Result<_, AuthError>`.
//! None of these errors ever reach the caller: the decision builder turns each
//! of them into a Deny decision and the detail is only logged server-side.

use thiserror::Error;

/// Failure kinds of the token verification pipeline.
///
/// `Clone` so that the outcome of one shared key-set fetch can be handed to
/// every caller that waited on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingHeader,

    #[error("Authorization header is not a bearer credential")]
    MalformedHeader,

    #[error("Signing key set unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("Signing key set is empty")]
    EmptyKeySet,

    #[error("No eligible signing key in key set")]
    NoEligibleSigningKey,

    #[error("Verification certificate unusable: {0}")]
    InvalidCertificate(String),

    #[error("Token is malformed")]
    MalformedToken,

    #[error("Token algorithm not accepted: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token signature is invalid")]
    SignatureInvalid,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token is not yet valid")]
    TokenNotYetValid,

    #[error("Token claim rejected: {0}")]
    ClaimRejected(String),
}

impl AuthError {
    /// Stable, bounded label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
            AuthError::EmptyKeySet => "empty_key_set",
            AuthError::NoEligibleSigningKey => "no_eligible_signing_key",
            AuthError::InvalidCertificate(_) => "invalid_certificate",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::ClaimRejected(_) => "claim_rejected",
        }
    }

    /// Whether the failure comes from the identity provider side (key set or
    /// certificate) rather than from what the caller presented.
    ///
    /// Upstream failures deny every caller until they clear, so operators
    /// need to see them at error level.
    pub fn is_upstream(&self) -> bool {
        match self {
            AuthError::KeySetUnavailable(_)
            | AuthError::EmptyKeySet
            | AuthError::NoEligibleSigningKey
            | AuthError::InvalidCertificate(_) => true,
            AuthError::MissingHeader
            | AuthError::MalformedHeader
            | AuthError::MalformedToken
            | AuthError::UnsupportedAlgorithm(_)
            | AuthError::SignatureInvalid
            | AuthError::TokenExpired
            | AuthError::TokenNotYetValid
            | AuthError::ClaimRejected(_) => false,
        }
    }
}
