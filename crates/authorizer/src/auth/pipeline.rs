//! The per-request authorization pipeline.
//!
//! Header extraction, certificate lookup, token verification and the
//! decision are run in order; the first failing stage ends the pipeline with
//! a Deny.

use crate::auth::certificate::CertificateCache;
use crate::auth::claims::IdentityClaims;
use crate::auth::extractor::extract_bearer_token;
use crate::auth::jwks::{HttpKeySetFetcher, KeySetSource};
use crate::auth::verifier::TokenVerifier;
use crate::config::Config;
use crate::errors::AuthError;
use crate::observability::metrics;
use crate::policy::{build_decision, AuthorizationDecision};
use std::sync::Arc;
use tracing::instrument;

/// Runs the authorization pipeline for one raw `Authorization` header.
///
/// Cheap to share: the certificate cache inside is the only state carried
/// across requests.
#[derive(Debug)]
pub struct Authorizer {
    jwks_url: String,
    cache: CertificateCache,
    verifier: TokenVerifier,
}

impl Authorizer {
    /// Create an authorizer with an explicit key-set source.
    pub fn new(jwks_url: String, source: Arc<dyn KeySetSource>, verifier: TokenVerifier) -> Self {
        Self {
            jwks_url,
            cache: CertificateCache::new(source),
            verifier,
        }
    }

    /// Create an authorizer fetching keys over HTTP as configured.
    pub fn from_config(config: &Config) -> Self {
        let fetcher = HttpKeySetFetcher::with_timeout(config.jwks_fetch_timeout);
        let verifier = TokenVerifier::new(
            config.jwt_clock_skew_seconds,
            config.jwt_audience.clone(),
            config.jwt_issuer.clone(),
        );
        Self::new(config.jwks_url.clone(), Arc::new(fetcher), verifier)
    }

    /// The certificate cache backing this authorizer.
    pub fn certificate_cache(&self) -> &CertificateCache {
        &self.cache
    }

    /// Decide whether the caller presenting `raw_header` may invoke the API.
    ///
    /// Never fails: every error becomes a Deny decision.
    #[instrument(skip_all)]
    pub async fn authorize(&self, raw_header: Option<&str>) -> AuthorizationDecision {
        let outcome = self.verify_header(raw_header).await;

        let reason = match &outcome {
            Ok(_) => "verified",
            Err(error) => error.kind(),
        };
        let decision = build_decision(outcome);
        metrics::record_decision(decision.effect().as_str(), reason);

        decision
    }

    /// Run extraction, certificate lookup and verification.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's `AuthError`.
    pub async fn verify_header(&self, raw_header: Option<&str>) -> Result<IdentityClaims, AuthError> {
        let token = extract_bearer_token(raw_header)?;
        let certificate = self.cache.get_certificate(&self.jwks_url).await?;
        self.verifier.verify(&token, &certificate)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::SigningKey;
    use crate::policy::{Effect, UNAUTHENTICATED_PRINCIPAL};
    use async_trait::async_trait;
    use authorizer_test_utils::crypto_fixtures::{now, sign_token, TestSigningKey};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        outcome: Result<Vec<SigningKey>, AuthError>,
        fetches: AtomicUsize,
    }

    impl StaticSource {
        fn new(outcome: Result<Vec<SigningKey>, AuthError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                fetches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl KeySetSource for StaticSource {
        async fn fetch(&self, _jwks_url: &str) -> Result<Vec<SigningKey>, AuthError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn published_keys() -> Vec<SigningKey> {
        vec![serde_json::from_value(TestSigningKey::primary().jwk_json()).unwrap()]
    }

    fn authorizer(source: Arc<StaticSource>) -> Authorizer {
        Authorizer::new(
            "https://tenant.example.com/.well-known/jwks.json".to_string(),
            source,
            TokenVerifier::default(),
        )
    }

    #[tokio::test]
    async fn test_valid_token_is_allowed() {
        let source = StaticSource::new(Ok(published_keys()));
        let authorizer = authorizer(source.clone());
        let token = sign_token(
            &TestSigningKey::primary(),
            &json!({ "sub": "auth0|abc123", "exp": now() + 3600 }),
        );

        let decision = authorizer.authorize(Some(&format!("Bearer {token}"))).await;

        assert_eq!(decision.effect(), Effect::Allow);
        assert_eq!(decision.principal_id, "auth0|abc123");
        assert!(authorizer.certificate_cache().cached().is_some());
    }

    #[tokio::test]
    async fn test_missing_header_denied_without_fetch() {
        let source = StaticSource::new(Ok(published_keys()));
        let authorizer = authorizer(source.clone());

        let decision = authorizer.authorize(None).await;

        assert_eq!(decision.effect(), Effect::Deny);
        assert_eq!(decision.principal_id, UNAUTHENTICATED_PRINCIPAL);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_key_set_denied() {
        let source = StaticSource::new(Err(AuthError::EmptyKeySet));
        let authorizer = authorizer(source);
        let token = sign_token(&TestSigningKey::primary(), &json!({ "sub": "auth0|abc123" }));
        let header = format!("Bearer {token}");

        assert_eq!(
            authorizer.verify_header(Some(&header)).await.unwrap_err(),
            AuthError::EmptyKeySet
        );
        assert!(!authorizer.authorize(Some(&header)).await.is_allowed());
    }

    #[tokio::test]
    async fn test_certificate_reused_across_requests() {
        let source = StaticSource::new(Ok(published_keys()));
        let authorizer = authorizer(source.clone());
        let key = TestSigningKey::primary();

        for user in ["auth0|one", "auth0|two", "auth0|three"] {
            let token = sign_token(&key, &json!({ "sub": user }));
            let decision = authorizer.authorize(Some(&format!("Bearer {token}"))).await;
            assert_eq!(decision.principal_id, user);
        }

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wrong_key_denied() {
        let authorizer = authorizer(StaticSource::new(Ok(published_keys())));
        let token = sign_token(&TestSigningKey::secondary(), &json!({ "sub": "auth0|abc123" }));

        let result = authorizer
            .verify_header(Some(&format!("Bearer {token}")))
            .await;

        assert_eq!(result.unwrap_err(), AuthError::SignatureInvalid);
    }
}
