//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - the verification certificate is cached or
//!   can be obtained now

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does NOT check any dependencies - failure means the process is hung.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 once the verification certificate is cached. On a cold cache
/// it triggers the fetch, so the first probe also warms the cache. Returns
/// 503 when the certificate cannot be obtained.
///
/// ## Security
///
/// Error messages are intentionally generic to avoid leaking infrastructure details.
/// Actual errors are logged server-side.
#[tracing::instrument(skip_all, name = "authz.health.readiness")]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let cache = state.authorizer.certificate_cache();

    if cache.cached().is_some() {
        return ready();
    }

    match cache.get_certificate(&state.config.jwks_url).await {
        Ok(_) => ready(),
        Err(e) => {
            tracing::warn!(
                target: "authz.cache",
                reason = e.kind(),
                error = %e,
                "Readiness check failed: verification certificate unavailable"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready".to_string(),
                    certificate: Some("unavailable".to_string()),
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
    }
}

fn ready() -> (StatusCode, Json<ReadinessResponse>) {
    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready".to_string(),
            certificate: Some("cached".to_string()),
            error: None,
        }),
    )
}
