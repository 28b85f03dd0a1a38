//! Verification certificate derivation and the process-lifetime cache.
//!
//! The first time a certificate is needed, the key set is fetched, the first
//! eligible key is selected, and its leaf certificate is re-framed as PEM.
//! The result is kept for the rest of the process lifetime. Failures are
//! never cached.
//!
//! # Concurrency
//!
//! - Reads after population are lock-free (`OnceLock`)
//! - Population goes through one shared in-flight future: callers racing on
//!   first use join the same fetch and all see the same outcome
//! - The fetch runs on its own task: a caller cancelled mid-fetch does not
//!   stall it, and its outcome is recorded even if nobody is waiting

use crate::auth::jwks::{is_eligible, KeySetSource, SigningKey};
use crate::errors::AuthError;
use crate::observability::metrics;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{instrument, Instrument};

/// Width of base64 lines inside the PEM body.
pub const PEM_LINE_WIDTH: usize = 64;

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// PEM-encoded X.509 certificate derived from one eligible signing key.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationCertificate {
    pem: String,
    key_id: Option<String>,
}

impl VerificationCertificate {
    /// Build the certificate from a key's leaf certificate.
    ///
    /// # Errors
    ///
    /// Returns `NoEligibleSigningKey` if the key is not eligible.
    pub fn from_signing_key(key: &SigningKey) -> Result<Self, AuthError> {
        if !is_eligible(key) {
            return Err(AuthError::NoEligibleSigningKey);
        }

        let leaf = key
            .leaf_certificate()
            .ok_or(AuthError::NoEligibleSigningKey)?;

        Ok(Self {
            pem: certificate_to_pem(leaf),
            key_id: key.kid.clone(),
        })
    }

    /// The PEM text, ready for a standard certificate parser.
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// Key ID of the signing key this certificate came from.
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }
}

impl fmt::Debug for VerificationCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationCertificate")
            .field("key_id", &self.key_id)
            .field("pem_bytes", &self.pem.len())
            .finish()
    }
}

/// Frame a base64 DER certificate as PEM with 64-character lines.
///
/// Whitespace in the input is dropped before re-wrapping.
pub fn certificate_to_pem(base64_der: &str) -> String {
    let body: Vec<char> = base64_der.chars().filter(|c| !c.is_whitespace()).collect();

    let mut pem = String::with_capacity(
        PEM_BEGIN.len() + PEM_END.len() + body.len() + body.len() / PEM_LINE_WIDTH + 3,
    );
    pem.push_str(PEM_BEGIN);
    pem.push('\n');
    for line in body.chunks(PEM_LINE_WIDTH) {
        pem.extend(line);
        pem.push('\n');
    }
    pem.push_str(PEM_END);
    pem.push('\n');
    pem
}

/// Pick the first eligible key, in published order.
///
/// # Errors
///
/// Returns `NoEligibleSigningKey` when no key passes [`is_eligible`].
pub fn select_signing_key(keys: &[SigningKey]) -> Result<&SigningKey, AuthError> {
    keys.iter().find(|key| is_eligible(key)).ok_or_else(|| {
        tracing::error!(
            target: "authz.cache",
            key_count = keys.len(),
            "No eligible signing key in JWKS"
        );
        AuthError::NoEligibleSigningKey
    })
}

type CertificateOutcome = Result<Arc<VerificationCertificate>, AuthError>;
type CertificateFetch = Shared<BoxFuture<'static, CertificateOutcome>>;

/// Single-slot, process-lifetime cache for the verification certificate.
///
/// The slot is not keyed by URL: the deployment binds to one identity
/// provider, so the first successfully populated certificate is returned for
/// every later call.
pub struct CertificateCache {
    source: Arc<dyn KeySetSource>,
    state: Arc<CacheState>,
}

struct CacheState {
    slot: OnceLock<Arc<VerificationCertificate>>,
    in_flight: Mutex<InFlight>,
}

#[derive(Default)]
struct InFlight {
    generation: u64,
    fetch: Option<CertificateFetch>,
}

impl CacheState {
    /// Record the outcome of fetch `generation`.
    ///
    /// The slot is filled before the in-flight fetch is cleared so a caller
    /// that takes the lock afterwards always finds one of the two.
    fn complete(&self, generation: u64, outcome: &CertificateOutcome) {
        if let Ok(certificate) = outcome {
            if self.slot.set(Arc::clone(certificate)).is_ok() {
                tracing::info!(
                    target: "authz.cache",
                    kid = certificate.key_id().unwrap_or("<none>"),
                    "Verification certificate cached"
                );
            }
        }

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight.generation == generation {
            in_flight.fetch = None;
        }
    }
}

impl CertificateCache {
    /// Create an empty cache that populates itself from `source`.
    pub fn new(source: Arc<dyn KeySetSource>) -> Self {
        Self {
            source,
            state: Arc::new(CacheState {
                slot: OnceLock::new(),
                in_flight: Mutex::new(InFlight::default()),
            }),
        }
    }

    /// The cached certificate, without triggering a fetch.
    pub fn cached(&self) -> Option<Arc<VerificationCertificate>> {
        self.state.slot.get().cloned()
    }

    /// Get the verification certificate, fetching the key set on first use.
    ///
    /// # Errors
    ///
    /// Propagates `KeySetUnavailable` / `EmptyKeySet` from the key-set source
    /// and returns `NoEligibleSigningKey` when the set has no usable key.
    /// None of these are cached.
    #[instrument(skip_all, fields(url = %jwks_url))]
    pub async fn get_certificate(&self, jwks_url: &str) -> CertificateOutcome {
        if let Some(certificate) = self.state.slot.get() {
            tracing::trace!(target: "authz.cache", "Certificate cache hit");
            metrics::record_certificate_cache("hit");
            return Ok(Arc::clone(certificate));
        }

        metrics::record_certificate_cache("miss");

        self.join_or_start_fetch(jwks_url).await
    }

    fn join_or_start_fetch(&self, jwks_url: &str) -> CertificateFetch {
        let mut in_flight = self
            .state
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Populated between the lock-free check and taking the lock
        if let Some(certificate) = self.state.slot.get() {
            return future::ready(Ok(Arc::clone(certificate))).boxed().shared();
        }

        if let Some(fetch) = in_flight.fetch.as_ref() {
            tracing::debug!(target: "authz.cache", "Joining in-flight certificate fetch");
            return fetch.clone();
        }

        tracing::debug!(target: "authz.cache", "Starting certificate fetch");
        in_flight.generation = in_flight.generation.wrapping_add(1);
        let generation = in_flight.generation;

        // The load runs on its own task so it completes, and records its
        // outcome, even when every waiting caller has been cancelled.
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let jwks_url = jwks_url.to_owned();
        let task = tokio::spawn(
            async move {
                let outcome = load_certificate(source.as_ref(), &jwks_url).await;
                state.complete(generation, &outcome);
                outcome
            }
            .in_current_span(),
        );

        let state = Arc::clone(&self.state);
        let fetch = task
            .map(move |joined| {
                joined.unwrap_or_else(|e| {
                    let outcome = Err(AuthError::KeySetUnavailable(format!(
                        "certificate fetch task failed: {e}"
                    )));
                    state.complete(generation, &outcome);
                    outcome
                })
            })
            .boxed()
            .shared();

        in_flight.fetch = Some(fetch.clone());
        fetch
    }
}

impl fmt::Debug for CertificateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateCache")
            .field("populated", &self.state.slot.get().is_some())
            .finish_non_exhaustive()
    }
}

async fn load_certificate(source: &dyn KeySetSource, jwks_url: &str) -> CertificateOutcome {
    let keys = source.fetch(jwks_url).await?;
    let key = select_signing_key(&keys)?;
    VerificationCertificate::from_signing_key(key).map(Arc::new)
}
