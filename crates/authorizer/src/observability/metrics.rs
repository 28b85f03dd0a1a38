//! Metrics definitions for the authorizer.
//!
//! All metrics follow Prometheus naming conventions:
//! - `authz_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: 5 values (known paths plus `/other`)
//! - `status`: 3 values (success, error, timeout)
//! - `effect`: Allow, Deny
//! - `reason`: `verified` plus the `AuthError::kind()` labels

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Authorizer calls sit in front of every API request
        .set_buckets_for_metric(
            Matcher::Prefix("authz_http_request".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("authz_jwks_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        // RS256 verification is sub-millisecond on warm caches
        .set_buckets_for_metric(
            Matcher::Prefix("authz_token_verification".to_string()),
            &[0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.010, 0.025],
        )
        .map_err(|e| format!("Failed to set token verification buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `authz_http_requests_total`, `authz_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("authz_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("authz_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto a bounded set of endpoint labels.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/v1/authorize" => "/v1/authorize",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}

// ============================================================================
// Decision Metrics
// ============================================================================

/// Record an authorization decision.
///
/// Metric: `authz_decisions_total`
/// Labels: `effect` (Allow/Deny), `reason` (`verified` or an error kind)
pub fn record_decision(effect: &'static str, reason: &'static str) {
    counter!("authz_decisions_total",
        "effect" => effect,
        "reason" => reason
    )
    .increment(1);
}

// ============================================================================
// Key Set / Certificate Metrics
// ============================================================================

/// Record a JWKS fetch.
///
/// Metric: `authz_jwks_fetch_total`, `authz_jwks_fetch_duration_seconds`
/// Labels: `status` (success, empty, error)
pub fn record_jwks_fetch(status: &str, duration: Duration) {
    histogram!("authz_jwks_fetch_duration_seconds").record(duration.as_secs_f64());

    counter!("authz_jwks_fetch_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a certificate cache lookup.
///
/// Metric: `authz_certificate_cache_total`
/// Labels: `result` (hit, miss)
pub fn record_certificate_cache(result: &'static str) {
    counter!("authz_certificate_cache_total",
        "result" => result
    )
    .increment(1);
}

/// Record the time spent verifying one token.
///
/// Metric: `authz_token_verification_duration_seconds`
pub fn record_token_verification(duration: Duration) {
    histogram!("authz_token_verification_duration_seconds").record(duration.as_secs_f64());
}

// ============================================================================
// Tests
// ============================================================================
