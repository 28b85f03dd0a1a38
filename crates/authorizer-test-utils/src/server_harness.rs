//! Test server harness for E2E testing
//!
//! Provides `TestAuthorizerServer` for spawning real authorizer instances in tests.

use authorizer::auth::Authorizer;
use authorizer::config::Config;
use authorizer::observability::metrics::init_metrics_recorder;
use authorizer::routes::{self, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Global metrics handle for test servers
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Prometheus handle shared by every server in the test process.
///
/// Installs the global recorder on first use; falls back to a detached
/// recorder if another one is already installed.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the authorizer in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> anyhow::Result<()> {
///     let server = TestAuthorizerServer::spawn("http://127.0.0.1:1/jwks").await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestAuthorizerServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestAuthorizerServer {
    /// Spawn a server whose key set is fetched from `jwks_url`.
    pub async fn spawn(jwks_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::from([(
            "AUTH0_JWKS_URL".to_string(),
            jwks_url.to_string(),
        )]))
        .await
    }

    /// Spawn a server from explicit configuration variables.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_vars(mut vars: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string());

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::from_config(config));
        let app = routes::build_routes(state.clone(), test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The server's authorization pipeline (and certificate cache).
    pub fn authorizer(&self) -> &Arc<Authorizer> {
        &self.state.authorizer
    }

    /// POST a TOKEN event carrying `authorization_token` and return the
    /// decision JSON. Fails if the response is not 200.
    pub async fn authorize(&self, authorization_token: Option<&str>) -> Result<Value, anyhow::Error> {
        let event = json!({
            "type": "TOKEN",
            "authorizationToken": authorization_token,
            "methodArn": "arn:aws:execute-api:us-east-1:123456789012:abcdef/dev/GET/todos"
        });

        let response = self
            .client
            .post(format!("{}/v1/authorize", self.url()))
            .json(&event)
            .send()
            .await?;

        anyhow::ensure!(
            response.status() == reqwest::StatusCode::OK,
            "authorize returned {}",
            response.status()
        );

        Ok(response.json().await?)
    }
}

impl Drop for TestAuthorizerServer {
    fn drop(&mut self) {
        // Abort the server task so the port is released when the test ends
        self._handle.abort();
    }
}
