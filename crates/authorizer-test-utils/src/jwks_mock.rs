//! Mock identity provider key-set endpoint.

use crate::crypto_fixtures::{jwks_json, TestSigningKey};
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock serves the key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A wiremock server standing in for the identity provider.
///
/// Mounted responses with an expected fetch count are verified when the
/// mock is dropped.
pub struct MockJwks {
    server: MockServer,
}

impl MockJwks {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Full key-set URL to configure the authorizer with.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Serve `keys` for any number of fetches.
    pub async fn serve_keys(&self, keys: &[&TestSigningKey]) {
        self.mount(ResponseTemplate::new(200).set_body_json(jwks_json(keys)), None)
            .await;
    }

    /// Serve `keys` and require exactly `fetches` requests.
    pub async fn serve_keys_expecting(&self, keys: &[&TestSigningKey], fetches: u64) {
        self.mount(
            ResponseTemplate::new(200).set_body_json(jwks_json(keys)),
            Some(fetches),
        )
        .await;
    }

    /// Serve `keys` after `delay`, requiring exactly `fetches` requests.
    pub async fn serve_keys_delayed(&self, keys: &[&TestSigningKey], delay: Duration, fetches: u64) {
        self.mount(
            ResponseTemplate::new(200)
                .set_body_json(jwks_json(keys))
                .set_delay(delay),
            Some(fetches),
        )
        .await;
    }

    /// Serve an arbitrary JSON document.
    pub async fn serve_json(&self, body: Value) {
        self.mount(ResponseTemplate::new(200).set_body_json(body), None)
            .await;
    }

    /// Answer every fetch with `status` and an empty body.
    pub async fn serve_status(&self, status: u16) {
        self.mount(ResponseTemplate::new(status), None).await;
    }

    /// Drop all mounted responses and recorded requests.
    pub async fn reset(&self) {
        self.server.reset().await;
    }

    /// Number of key-set requests received so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| {
                requests
                    .iter()
                    .filter(|request| request.url.path() == JWKS_PATH)
                    .count()
            })
            .unwrap_or_default()
    }

    async fn mount(&self, response: ResponseTemplate, expected_fetches: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response);

        let mock = match expected_fetches {
            Some(fetches) => mock.expect(fetches),
            None => mock,
        };

        mock.mount(&self.server).await;
    }
}
