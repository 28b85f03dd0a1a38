//! HTTP metrics middleware for capturing all request/response metrics
//!
//! Applied as the outermost layer, so framework-level rejections (415, 400,
//! 404, 405) and timeouts are recorded alongside handler responses.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records method, normalized path, status and duration of
/// every response.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    async fn handler_200() -> &'static str {
        "OK"
    }

    async fn handler_503() -> (StatusCode, &'static str) {
        (StatusCode::SERVICE_UNAVAILABLE, "Unavailable")
    }

    fn test_app() -> Router {
        Router::new()
            .route("/health", get(handler_200))
            .route("/ready", get(handler_503))
            .route("/v1/authorize", post(handler_200))
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    async fn status_of(method: &str, uri: &str) -> StatusCode {
        let request = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request builder should succeed");

        test_app()
            .oneshot(request)
            .await
            .expect("request should succeed")
            .status()
    }

    #[tokio::test]
    async fn test_middleware_passes_success_through() {
        assert_eq!(status_of("GET", "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_passes_error_through() {
        assert_eq!(status_of("GET", "/ready").await, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_middleware_sees_framework_rejections() {
        assert_eq!(status_of("GET", "/nonexistent").await, StatusCode::NOT_FOUND);
        assert_eq!(
            status_of("GET", "/v1/authorize").await,
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
