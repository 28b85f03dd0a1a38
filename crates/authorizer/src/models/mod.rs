//! Request and response types of the HTTP surface.

use serde::{Deserialize, Serialize};

/// Custom-authorizer TOKEN event posted by the API gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerEvent {
    /// Event type, `TOKEN` for header-based authorizers.
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,

    /// Raw `Authorization` header value.
    #[serde(default)]
    pub authorization_token: Option<String>,

    /// ARN of the method being invoked.
    #[serde(default)]
    pub method_arn: Option<String>,
}

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness probe).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: String,

    /// Verification certificate status ("cached" or "unavailable").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,

    /// Error message (generic, no infrastructure details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
