//! JWKS fetching and signing-key eligibility.
//!
//! The identity provider publishes its signing keys at a JWKS (JSON Web Key
//! Set) endpoint. This module fetches that document and deserializes it into
//! strongly typed [`SigningKey`] records. Choosing which key to trust is kept
//! separate, in [`is_eligible`], so the policy can be tested on its own.
//!
//! # Security
//!
//! - The fetcher does not filter or reorder keys; selection is the cache's job
//! - Fetch failures are never retried inside a request
//! - HTTPS should be used in production (enforced by deployment config)

use crate::errors::AuthError;
use crate::observability::metrics;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Default JWKS request timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Only keys intended for signatures are eligible.
pub const ELIGIBLE_KEY_USE: &str = "sig";

/// Only RSA keys are eligible.
pub const ELIGIBLE_KEY_TYPE: &str = "RSA";

/// Only keys published for RS256 are eligible.
pub const ELIGIBLE_ALGORITHM: &str = "RS256";

/// One JSON Web Key from the identity provider's key set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SigningKey {
    /// Key ID.
    #[serde(default)]
    pub kid: Option<String>,

    /// Key type (e.g. "RSA", "EC").
    pub kty: String,

    /// Intended use ("sig" or "enc").
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// Algorithm the key is published for (e.g. "RS256").
    #[serde(default)]
    pub alg: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// X.509 certificate chain, leaf first, each entry standard base64 DER.
    #[serde(default)]
    pub x5c: Vec<String>,
}

impl SigningKey {
    /// The leaf certificate of the chain, if present and non-blank.
    pub fn leaf_certificate(&self) -> Option<&str> {
        self.x5c
            .first()
            .map(String::as_str)
            .filter(|entry| !entry.trim().is_empty())
    }
}

/// Whether a key may be used to build the verification certificate.
///
/// Eligible keys are RSA signature keys published for RS256 that carry a key
/// id, both public-key components and a certificate chain.
pub fn is_eligible(key: &SigningKey) -> bool {
    key.key_use.as_deref() == Some(ELIGIBLE_KEY_USE)
        && key.kty == ELIGIBLE_KEY_TYPE
        && key.alg.as_deref() == Some(ELIGIBLE_ALGORITHM)
        && is_present(key.kid.as_deref())
        && is_present(key.n.as_deref())
        && is_present(key.e.as_deref())
        && key.leaf_certificate().is_some()
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// JWKS document as served by the identity provider.
#[derive(Debug, Deserialize)]
struct JwksResponse {
    #[serde(default)]
    keys: Option<Vec<SigningKey>>,
}

/// Source of the identity provider's signing keys.
///
/// The HTTP implementation is [`HttpKeySetFetcher`]; the seam exists so the
/// certificate cache can be exercised without a network.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch the key set, preserving the published order.
    ///
    /// # Errors
    ///
    /// - `KeySetUnavailable` - network failure, non-2xx status, or unparseable body
    /// - `EmptyKeySet` - the `keys` array is empty or absent
    async fn fetch(&self, jwks_url: &str) -> Result<Vec<SigningKey>, AuthError>;
}

/// Fetches the key set over HTTP with a single GET per call.
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    http_client: reqwest::Client,
}

impl HttpKeySetFetcher {
    /// Create a fetcher with the default request timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS))
    }

    /// Create a fetcher with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("authorizer/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "authz.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self { http_client }
    }

    async fn fetch_document(&self, jwks_url: &str) -> Result<JwksResponse, AuthError> {
        let response = self.http_client.get(jwks_url).send().await.map_err(|e| {
            tracing::error!(target: "authz.jwks", error = %e, "Failed to fetch JWKS");
            AuthError::KeySetUnavailable(format!("request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "authz.jwks",
                status = %status,
                "JWKS endpoint returned error"
            );
            return Err(AuthError::KeySetUnavailable(format!(
                "endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        response.json::<JwksResponse>().await.map_err(|e| {
            tracing::error!(target: "authz.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::KeySetUnavailable(format!("unparseable body: {e}"))
        })
    }
}

impl Default for HttpKeySetFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetFetcher {
    #[instrument(skip_all, fields(url = %jwks_url))]
    async fn fetch(&self, jwks_url: &str) -> Result<Vec<SigningKey>, AuthError> {
        tracing::debug!(target: "authz.jwks", "Fetching JWKS from identity provider");

        let start = Instant::now();
        let result = self.fetch_document(jwks_url).await.and_then(|document| {
            match document.keys {
                Some(keys) if !keys.is_empty() => Ok(keys),
                _ => {
                    tracing::error!(target: "authz.jwks", "JWKS contains no keys");
                    Err(AuthError::EmptyKeySet)
                }
            }
        });

        let status = match &result {
            Ok(_) => "success",
            Err(AuthError::EmptyKeySet) => "empty",
            Err(_) => "error",
        };
        metrics::record_jwks_fetch(status, start.elapsed());

        if let Ok(keys) = &result {
            tracing::info!(target: "authz.jwks", key_count = keys.len(), "JWKS fetched");
        }

        result
    }
}
