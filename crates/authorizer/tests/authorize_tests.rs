//! End-to-end authorization tests.
//!
//! Spawns the real router against a mocked identity-provider key set and
//! posts custom-authorizer events over HTTP.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use authorizer_test_utils::{
    alg_none_token, hs256_token, now, sign_token, valid_claims, MockJwks, TestAuthorizerServer,
    TestSigningKey,
};
use serde_json::{json, Value};
use std::collections::HashMap;

async fn server_with_primary_key() -> Result<(MockJwks, TestAuthorizerServer)> {
    let jwks = MockJwks::start().await;
    jwks.serve_keys(&[&TestSigningKey::primary()]).await;
    let server = TestAuthorizerServer::spawn(&jwks.jwks_url()).await?;
    Ok((jwks, server))
}

fn expected_decision(principal: &str, effect: &str) -> Value {
    json!({
        "principalId": principal,
        "policyDocument": {
            "Version": "2012-10-17",
            "Statement": [{
                "Action": "execute-api:Invoke",
                "Effect": effect,
                "Resource": "*"
            }]
        }
    })
}

fn deny() -> Value {
    expected_decision("user", "Deny")
}

// =============================================================================
// Allow
// =============================================================================

#[tokio::test]
async fn test_valid_token_is_allowed() -> Result<()> {
    let (_jwks, server) = server_with_primary_key().await?;
    let token = sign_token(&TestSigningKey::primary(), &valid_claims("auth0|abc123"));

    let decision = server.authorize(Some(&format!("Bearer {token}"))).await?;

    assert_eq!(decision, expected_decision("auth0|abc123", "Allow"));
    Ok(())
}

#[tokio::test]
async fn test_lowercase_scheme_is_allowed() -> Result<()> {
    let (_jwks, server) = server_with_primary_key().await?;
    let token = sign_token(&TestSigningKey::primary(), &valid_claims("auth0|abc123"));

    let decision = server.authorize(Some(&format!("bearer {token}"))).await?;

    assert_eq!(decision["principalId"], "auth0|abc123");
    Ok(())
}

#[tokio::test]
async fn test_first_eligible_key_is_used() -> Result<()> {
    let jwks = MockJwks::start().await;
    let primary = TestSigningKey::primary();
    let mut encryption_key = TestSigningKey::secondary().jwk_json();
    encryption_key["use"] = json!("enc");
    let mut ec_key = TestSigningKey::secondary().jwk_json();
    ec_key["kty"] = json!("EC");
    jwks.serve_json(json!({
        "keys": [encryption_key, ec_key, primary.jwk_json(), TestSigningKey::secondary().jwk_json()]
    }))
    .await;
    let server = TestAuthorizerServer::spawn(&jwks.jwks_url()).await?;

    let primary_token = sign_token(&primary, &valid_claims("auth0|primary"));
    let secondary_token = sign_token(&TestSigningKey::secondary(), &valid_claims("auth0|secondary"));

    let allowed = server.authorize(Some(&format!("Bearer {primary_token}"))).await?;
    let denied = server.authorize(Some(&format!("Bearer {secondary_token}"))).await?;

    assert_eq!(allowed, expected_decision("auth0|primary", "Allow"));
    assert_eq!(denied, deny());
    Ok(())
}

// =============================================================================
// Deny: header problems
// =============================================================================

#[tokio::test]
async fn test_missing_header_is_denied() -> Result<()> {
    let (_jwks, server) = server_with_primary_key().await?;

    assert_eq!(server.authorize(None).await?, deny());
    assert_eq!(server.authorize(Some("")).await?, deny());
    Ok(())
}

#[tokio::test]
async fn test_non_bearer_header_is_denied() -> Result<()> {
    let (_jwks, server) = server_with_primary_key().await?;
    let token = sign_token(&TestSigningKey::primary(), &valid_claims("auth0|abc123"));

    for header in [
        format!("Basic {token}"),
        token.clone(),
        "Bearer".to_string(),
        "Bearer ".to_string(),
    ] {
        assert_eq!(server.authorize(Some(&header)).await?, deny(), "header: {header}");
    }
    Ok(())
}

#[tokio::test]
async fn test_invalid_event_body_is_denied() -> Result<()> {
    let (_jwks, server) = server_with_primary_key().await?;
    let client = reqwest::Client::new();

    let not_json = client
        .post(format!("{}/v1/authorize", server.url()))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await?;
    assert_eq!(not_json.status(), 200);
    assert_eq!(not_json.json::<Value>().await?, deny());

    let no_body = client
        .post(format!("{}/v1/authorize", server.url()))
        .send()
        .await?;
    assert_eq!(no_body.status(), 200);
    assert_eq!(no_body.json::<Value>().await?, deny());

    Ok(())
}

// =============================================================================
// Deny: token problems
// =============================================================================

#[tokio::test]
async fn test_expired_token_is_denied() -> Result<()> {
    let (_jwks, server) = server_with_primary_key().await?;
    let token = sign_token(
        &TestSigningKey::primary(),
        &json!({ "sub": "auth0|abc123", "iat": now() - 7200, "exp": now() - 3600 }),
    );

    assert_eq!(server.authorize(Some(&format!("Bearer {token}"))).await?, deny());
    Ok(())
}

#[tokio::test]
async fn test_not_yet_valid_token_is_denied() -> Result<()> {
    let (_jwks, server) = server_with_primary_key().await?;
    let token = sign_token(
        &TestSigningKey::primary(),
        &json!({ "sub": "auth0|abc123", "nbf": now() + 3600, "exp": now() + 7200 }),
    );

    assert_eq!(server.authorize(Some(&format!("Bearer {token}"))).await?, deny());
    Ok(())
}

#[tokio::test]
async fn test_token_signed_by_other_key_is_denied() -> Result<()> {
    let (_jwks, server) = server_with_primary_key().await?;
    let token = sign_token(&TestSigningKey::secondary(), &valid_claims("auth0|abc123"));

    assert_eq!(server.authorize(Some(&format!("Bearer {token}"))).await?, deny());
    Ok(())
}

#[tokio::test]
async fn test_non_rs256_tokens_are_denied() -> Result<()> {
    let (_jwks, server) = server_with_primary_key().await?;

    for token in [
        hs256_token(&valid_claims("auth0|abc123")),
        alg_none_token(&valid_claims("auth0|abc123")),
    ] {
        assert_eq!(server.authorize(Some(&format!("Bearer {token}"))).await?, deny());
    }
    Ok(())
}

#[tokio::test]
async fn test_garbage_token_is_denied() -> Result<()> {
    let (_jwks, server) = server_with_primary_key().await?;

    let oversized = "x".repeat(10_000);

    for token in ["abc", "a.b.c", "a.b", oversized.as_str()] {
        assert_eq!(server.authorize(Some(&format!("Bearer {token}"))).await?, deny());
    }
    Ok(())
}

#[tokio::test]
async fn test_configured_audience_is_enforced() -> Result<()> {
    let jwks = MockJwks::start().await;
    jwks.serve_keys(&[&TestSigningKey::primary()]).await;
    let server = TestAuthorizerServer::spawn_with_vars(HashMap::from([
        ("AUTH0_JWKS_URL".to_string(), jwks.jwks_url()),
        ("JWT_AUDIENCE".to_string(), "https://api.example.com".to_string()),
    ]))
    .await?;
    let key = TestSigningKey::primary();

    let matching = sign_token(&key, &valid_claims("auth0|abc123"));
    let other_audience = sign_token(
        &key,
        &json!({ "sub": "auth0|abc123", "aud": "https://other.example.com", "exp": now() + 3600 }),
    );

    assert_eq!(
        server.authorize(Some(&format!("Bearer {matching}"))).await?,
        expected_decision("auth0|abc123", "Allow")
    );
    assert_eq!(
        server.authorize(Some(&format!("Bearer {other_audience}"))).await?,
        deny()
    );
    Ok(())
}

// =============================================================================
// Deny: key set problems
// =============================================================================

#[tokio::test]
async fn test_empty_key_set_is_denied() -> Result<()> {
    let jwks = MockJwks::start().await;
    jwks.serve_json(json!({ "keys": [] })).await;
    let server = TestAuthorizerServer::spawn(&jwks.jwks_url()).await?;
    let token = sign_token(&TestSigningKey::primary(), &valid_claims("auth0|abc123"));

    assert_eq!(server.authorize(Some(&format!("Bearer {token}"))).await?, deny());
    assert!(server.authorizer().certificate_cache().cached().is_none());
    Ok(())
}

#[tokio::test]
async fn test_key_set_unavailable_is_denied_then_recovers() -> Result<()> {
    let jwks = MockJwks::start().await;
    jwks.serve_status(503).await;
    let server = TestAuthorizerServer::spawn(&jwks.jwks_url()).await?;
    let token = sign_token(&TestSigningKey::primary(), &valid_claims("auth0|abc123"));
    let header = format!("Bearer {token}");

    assert_eq!(server.authorize(Some(&header)).await?, deny());

    // Failures are not cached: once the provider recovers the next request succeeds
    jwks.reset().await;
    jwks.serve_keys(&[&TestSigningKey::primary()]).await;

    assert_eq!(
        server.authorize(Some(&header)).await?,
        expected_decision("auth0|abc123", "Allow")
    );
    Ok(())
}

#[tokio::test]
async fn test_unreachable_key_set_is_denied() -> Result<()> {
    let server = TestAuthorizerServer::spawn("http://127.0.0.1:1/.well-known/jwks.json").await?;
    let token = sign_token(&TestSigningKey::primary(), &valid_claims("auth0|abc123"));

    assert_eq!(server.authorize(Some(&format!("Bearer {token}"))).await?, deny());
    Ok(())
}

#[tokio::test]
async fn test_no_eligible_key_is_denied() -> Result<()> {
    let jwks = MockJwks::start().await;
    let mut without_chain = TestSigningKey::primary().jwk_json();
    without_chain["x5c"] = json!([]);
    jwks.serve_json(json!({ "keys": [without_chain] })).await;
    let server = TestAuthorizerServer::spawn(&jwks.jwks_url()).await?;
    let token = sign_token(&TestSigningKey::primary(), &valid_claims("auth0|abc123"));

    assert_eq!(server.authorize(Some(&format!("Bearer {token}"))).await?, deny());
    Ok(())
}
