//! Authorization decisions and the policy document returned to the gateway.
//!
//! The wire shape is fixed by the gateway's custom-authorizer contract:
//! camelCase at the top level, PascalCase inside the policy document.

use crate::auth::claims::IdentityClaims;
use crate::errors::AuthError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy language version understood by the gateway.
pub const POLICY_VERSION: &str = "2012-10-17";

/// The single action every statement governs.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Resource scope of every statement.
pub const WILDCARD_RESOURCE: &str = "*";

/// Principal reported when the caller could not be identified.
pub const UNAUTHENTICATED_PRINCIPAL: &str = "user";

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: String,
    pub effect: Effect,
    pub resource: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

/// Allow/deny decision for one request, serialized for the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDecision {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
}

impl AuthorizationDecision {
    /// Allow `principal` to invoke any resource.
    pub fn allow(principal: impl Into<String>) -> Self {
        Self::with_effect(principal.into(), Effect::Allow)
    }

    /// Deny the unidentified caller.
    pub fn deny() -> Self {
        Self::with_effect(UNAUTHENTICATED_PRINCIPAL.to_string(), Effect::Deny)
    }

    fn with_effect(principal_id: String, effect: Effect) -> Self {
        Self {
            principal_id,
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: vec![Statement {
                    action: INVOKE_ACTION.to_string(),
                    effect,
                    resource: WILDCARD_RESOURCE.to_string(),
                }],
            },
        }
    }

    /// Effect of the (single) statement.
    pub fn effect(&self) -> Effect {
        self.policy_document
            .statement
            .iter()
            .map(|statement| statement.effect)
            .find(|effect| *effect == Effect::Allow)
            .unwrap_or(Effect::Deny)
    }

    pub fn is_allowed(&self) -> bool {
        self.effect() == Effect::Allow
    }
}

/// Turn a verification outcome into a decision. Never fails.
///
/// Failure detail is logged here and never returned to the caller.
pub fn build_decision(outcome: Result<IdentityClaims, AuthError>) -> AuthorizationDecision {
    let error = match outcome {
        Ok(claims) => {
            tracing::info!(target: "authz.decision", effect = "Allow", "Caller authorized");
            return AuthorizationDecision::allow(claims.sub);
        }
        Err(error) => error,
    };

    if error.is_upstream() {
        tracing::error!(
            target: "authz.decision",
            effect = "Deny",
            reason = error.kind(),
            error = %error,
            "Denying request: verification certificate unavailable"
        );
    } else if matches!(
        error,
        AuthError::SignatureInvalid | AuthError::UnsupportedAlgorithm(_) | AuthError::ClaimRejected(_)
    ) {
        tracing::info!(
            target: "authz.decision",
            effect = "Deny",
            reason = error.kind(),
            error = %error,
            "Denying request: token rejected"
        );
    } else {
        tracing::debug!(
            target: "authz.decision",
            effect = "Deny",
            reason = error.kind(),
            "Denying request"
        );
    }

    AuthorizationDecision::deny()
}
