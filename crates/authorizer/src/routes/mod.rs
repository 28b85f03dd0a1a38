//! HTTP routes for the authorizer.
//!
//! Defines the Axum router and application state.

use crate::auth::Authorizer;
use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Per-request timeout; exceeds every fetch timeout `Config` accepts.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Authorization pipeline, holding the process-lifetime certificate cache.
    pub authorizer: Arc<Authorizer>,
}

impl AppState {
    /// Build state with an HTTP-backed authorizer.
    pub fn from_config(config: Config) -> Self {
        let authorizer = Arc::new(Authorizer::from_config(&config));
        Self { config, authorizer }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/authorize` - Custom-authorizer endpoint
/// - `/health` - Liveness probe (simple "OK")
/// - `/ready` - Readiness probe (verification certificate obtainable)
/// - `/metrics` - Prometheus metrics endpoint
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let app_routes = Router::new()
        .route("/v1/authorize", post(handlers::authorize))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    app_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(http_metrics_middleware))
}
