//! Custom-authorizer endpoint.

use crate::models::AuthorizerEvent;
use crate::policy::AuthorizationDecision;
use crate::routes::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Handler for POST /v1/authorize
///
/// Always answers 200 with a decision. A body that is missing or cannot be
/// parsed as an event is treated like a request without an `Authorization`
/// header and is denied.
#[tracing::instrument(skip_all, name = "authz.authorize")]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    event: Result<Json<AuthorizerEvent>, JsonRejection>,
) -> Json<AuthorizationDecision> {
    let event = match event {
        Ok(Json(event)) => event,
        Err(rejection) => {
            tracing::debug!(
                target: "authz.extract",
                error = %rejection,
                "Authorizer event rejected, treating as missing header"
            );
            AuthorizerEvent::default()
        }
    };

    if let Some(event_type) = event.event_type.as_deref() {
        if event_type != "TOKEN" {
            tracing::debug!(target: "authz.extract", event_type = %event_type, "Unexpected authorizer event type");
        }
    }

    let decision = state
        .authorizer
        .authorize(event.authorization_token.as_deref())
        .await;

    Json(decision)
}
