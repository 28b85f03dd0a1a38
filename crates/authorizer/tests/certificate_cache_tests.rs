//! Certificate cache tests against a mocked HTTP key set.
//!
//! Fetch counts are asserted with wiremock expectations, which are verified
//! when the mock server drops.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use authorizer::auth::{CertificateCache, HttpKeySetFetcher};
use authorizer::errors::AuthError;
use authorizer_test_utils::{MockJwks, TestSigningKey};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn http_cache() -> CertificateCache {
    CertificateCache::new(Arc::new(HttpKeySetFetcher::new()))
}

#[tokio::test]
async fn test_certificate_matches_published_leaf() {
    let jwks = MockJwks::start().await;
    let key = TestSigningKey::primary();
    jwks.serve_keys_expecting(&[&key], 1).await;
    let cache = http_cache();

    let certificate = cache.get_certificate(&jwks.jwks_url()).await.unwrap();

    assert_eq!(certificate.pem(), key.certificate_pem());
    assert_eq!(certificate.key_id(), Some(key.kid()));
}

#[tokio::test]
async fn test_repeated_calls_fetch_once() {
    let jwks = MockJwks::start().await;
    jwks.serve_keys_expecting(&[&TestSigningKey::primary()], 1).await;
    let cache = http_cache();

    let first = cache.get_certificate(&jwks.jwks_url()).await.unwrap();
    for _ in 0..5 {
        let again = cache.get_certificate(&jwks.jwks_url()).await.unwrap();
        assert_eq!(again.pem().as_bytes(), first.pem().as_bytes());
    }

    // Single slot: a different URL still gets the cached certificate
    let other = cache
        .get_certificate("http://127.0.0.1:1/.well-known/jwks.json")
        .await
        .unwrap();
    assert_eq!(other.pem(), first.pem());
}

#[tokio::test]
async fn test_concurrent_first_calls_share_one_fetch() {
    let jwks = MockJwks::start().await;
    jwks.serve_keys_delayed(&[&TestSigningKey::primary()], Duration::from_millis(200), 1)
        .await;
    let cache = Arc::new(http_cache());
    let url = jwks.jwks_url();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let url = url.clone();
            tokio::spawn(async move { cache.get_certificate(&url).await })
        })
        .collect();

    let mut pems = Vec::new();
    for handle in handles {
        pems.push(handle.await.unwrap().unwrap().pem().to_string());
    }

    assert_eq!(pems.len(), 20);
    assert!(pems.iter().all(|pem| pem == TestSigningKey::primary().certificate_pem()));
    assert_eq!(jwks.fetch_count().await, 1);
}

#[tokio::test]
async fn test_no_eligible_key_refetches_every_call() {
    let jwks = MockJwks::start().await;
    let mut encryption_key = TestSigningKey::primary().jwk_json();
    encryption_key["use"] = json!("enc");
    jwks.serve_json(json!({ "keys": [encryption_key] })).await;
    let cache = http_cache();

    for attempt in 1..=3 {
        let result = cache.get_certificate(&jwks.jwks_url()).await;
        assert_eq!(result.unwrap_err(), AuthError::NoEligibleSigningKey);
        assert_eq!(jwks.fetch_count().await, attempt);
    }
    assert!(cache.cached().is_none());
}

#[tokio::test]
async fn test_empty_key_set_is_not_cached() {
    let jwks = MockJwks::start().await;
    jwks.serve_json(json!({ "keys": [] })).await;
    let cache = http_cache();

    assert_eq!(
        cache.get_certificate(&jwks.jwks_url()).await.unwrap_err(),
        AuthError::EmptyKeySet
    );

    jwks.reset().await;
    jwks.serve_keys(&[&TestSigningKey::primary()]).await;

    let certificate = cache.get_certificate(&jwks.jwks_url()).await.unwrap();
    assert_eq!(certificate.pem(), TestSigningKey::primary().certificate_pem());
}

#[tokio::test]
async fn test_server_error_maps_to_unavailable() {
    let jwks = MockJwks::start().await;
    jwks.serve_status(500).await;
    let cache = http_cache();

    let result = cache.get_certificate(&jwks.jwks_url()).await;

    assert!(matches!(result, Err(AuthError::KeySetUnavailable(_))));
}

#[tokio::test]
async fn test_cancelled_first_caller_does_not_fail_later_callers() {
    let jwks = MockJwks::start().await;
    let key = TestSigningKey::primary();
    jwks.serve_keys_delayed(&[&key], Duration::from_millis(300), 1)
        .await;
    let cache = CertificateCache::new(Arc::new(HttpKeySetFetcher::with_timeout(
        Duration::from_millis(500),
    )));
    let url = jwks.jwks_url();

    // First caller gives up long before the key set arrives
    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), cache.get_certificate(&url)).await;
    assert!(abandoned.is_err());

    // Well past the fetcher timeout measured from the first request
    tokio::time::sleep(Duration::from_secs(1)).await;

    let certificate = cache.get_certificate(&url).await.unwrap();
    assert_eq!(certificate.key_id(), Some(key.kid()));
    assert_eq!(jwks.fetch_count().await, 1);
}
