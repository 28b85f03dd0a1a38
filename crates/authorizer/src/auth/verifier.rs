//! Token signature and claim verification.
//!
//! # Security
//!
//! - Tokens are size- and shape-checked BEFORE any decoding (DoS prevention)
//! - Only RS256 is accepted; the advertised algorithm is checked before the
//!   key is built and again by `jsonwebtoken`
//! - `exp` and `nbf` are validated when present, with clock skew leeway
//! - Audience and issuer are only enforced when configured

use crate::auth::certificate::VerificationCertificate;
use crate::auth::claims::IdentityClaims;
use crate::auth::extractor::BearerToken;
use crate::errors::AuthError;
use crate::observability::metrics;
use common::jwt::{inspect_header, JwtValidationError, DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::time::Instant;
use tracing::instrument;

/// The only algorithm a token may be signed with.
pub const ACCEPTED_ALGORITHM: &str = "RS256";

/// Verifies bearer tokens against the verification certificate.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier.
    ///
    /// # Arguments
    ///
    /// * `leeway_seconds` - Clock skew tolerance for `exp`/`nbf`, capped at
    ///   [`MAX_CLOCK_SKEW`]
    /// * `audience` - Required `aud` value, if any
    /// * `issuer` - Required `iss` value, if any
    pub fn new(leeway_seconds: u64, audience: Option<String>, issuer: Option<String>) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);

        // Time claims are checked only when present
        validation.set_required_spec_claims::<&str>(&[]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = leeway_seconds.min(MAX_CLOCK_SKEW.as_secs());

        match audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                validation.required_spec_claims.insert("aud".to_string());
            }
            None => validation.validate_aud = false,
        }

        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
            validation.required_spec_claims.insert("iss".to_string());
        }

        Self { validation }
    }

    /// Clock skew tolerance in seconds.
    pub fn leeway_seconds(&self) -> u64 {
        self.validation.leeway
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// - `MalformedToken` - bad shape, oversized, undecodable, or empty `sub`
    /// - `UnsupportedAlgorithm` - header names anything other than RS256
    /// - `InvalidCertificate` - the certificate has no usable RSA public key
    /// - `SignatureInvalid` - signature does not verify
    /// - `TokenExpired` / `TokenNotYetValid` - time bounds violated
    /// - `ClaimRejected` - configured audience or issuer not satisfied
    #[instrument(skip_all, fields(kid = certificate.key_id().unwrap_or("<none>")))]
    pub fn verify(
        &self,
        token: &BearerToken,
        certificate: &VerificationCertificate,
    ) -> Result<IdentityClaims, AuthError> {
        let start = Instant::now();
        let result = self.verify_inner(token.expose(), certificate);
        metrics::record_token_verification(start.elapsed());
        result
    }

    fn verify_inner(
        &self,
        token: &str,
        certificate: &VerificationCertificate,
    ) -> Result<IdentityClaims, AuthError> {
        let header = inspect_header(token).map_err(|e| match e {
            JwtValidationError::MissingAlgorithm => {
                tracing::debug!(target: "authz.verify", "Token header has no algorithm");
                AuthError::UnsupportedAlgorithm(String::new())
            }
            JwtValidationError::TokenTooLarge | JwtValidationError::MalformedToken => {
                tracing::debug!(target: "authz.verify", error = ?e, "Token failed shape check");
                AuthError::MalformedToken
            }
        })?;

        if header.alg != ACCEPTED_ALGORITHM {
            tracing::debug!(target: "authz.verify", alg = %header.alg, "Token algorithm rejected");
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }

        // The certificate is not re-selected by kid; a mismatch usually means
        // the provider rotated keys
        if let (Some(token_kid), Some(cert_kid)) = (header.kid.as_deref(), certificate.key_id()) {
            if token_kid != cert_kid {
                tracing::debug!(
                    target: "authz.verify",
                    token_kid = %token_kid,
                    certificate_kid = %cert_kid,
                    "Token kid does not match verification certificate"
                );
            }
        }

        let decoding_key = DecodingKey::from_rsa_pem(certificate.pem().as_bytes()).map_err(|e| {
            tracing::error!(target: "authz.verify", error = %e, "Verification certificate is unusable");
            AuthError::InvalidCertificate(e.to_string())
        })?;

        let token_data = decode::<IdentityClaims>(token, &decoding_key, &self.validation)
            .map_err(|e| {
                let error = map_jwt_error(e.kind());
                tracing::debug!(
                    target: "authz.verify",
                    error = %e,
                    kind = error.kind(),
                    "Token verification failed"
                );
                error
            })?;

        let claims = token_data.claims;
        if claims.sub.trim().is_empty() {
            tracing::debug!(target: "authz.verify", "Token subject is empty");
            return Err(AuthError::MalformedToken);
        }

        tracing::debug!(target: "authz.verify", "Token verified successfully");
        Ok(claims)
    }
}

impl Default for TokenVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_CLOCK_SKEW.as_secs(), None, None)
    }
}

/// Map a `jsonwebtoken` failure onto the pipeline taxonomy.
///
/// Unknown kinds fail closed as `SignatureInvalid`.
fn map_jwt_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
        ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
            AuthError::UnsupportedAlgorithm(String::new())
        }
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => AuthError::MalformedToken,
        ErrorKind::InvalidAudience => AuthError::ClaimRejected("aud".to_string()),
        ErrorKind::InvalidIssuer => AuthError::ClaimRejected("iss".to_string()),
        ErrorKind::MissingRequiredClaim(claim) => AuthError::ClaimRejected(claim.clone()),
        _ => AuthError::SignatureInvalid,
    }
}
