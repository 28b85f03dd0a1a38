//! Authorizer configuration.
//!
//! Configuration is loaded from environment variables.

use crate::auth::jwks::DEFAULT_FETCH_TIMEOUT_SECONDS;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Upper bound for the JWKS fetch timeout in seconds.
///
/// Stays below the router's request timeout so a slow identity provider
/// still ends in a Deny decision rather than a 408.
pub const MAX_FETCH_TIMEOUT_SECONDS: u64 = 25;

/// Authorizer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity provider key-set discovery URL.
    pub jwks_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Clock skew tolerance in seconds for `exp`/`nbf` validation.
    pub jwt_clock_skew_seconds: u64,

    /// Request timeout for the key-set fetch.
    pub jwks_fetch_timeout: Duration,

    /// Required `aud` claim, if configured.
    pub jwt_audience: Option<String>,

    /// Required `iss` claim, if configured.
    pub jwt_issuer: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWKS URL: {0}")]
    InvalidJwksUrl(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidFetchTimeout(String),

    #[error("Invalid claim requirement: {0}")]
    InvalidClaimRequirement(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwks_url = vars
            .get("AUTH0_JWKS_URL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("AUTH0_JWKS_URL".to_string()))?;

        if !(jwks_url.starts_with("http://") || jwks_url.starts_with("https://")) {
            return Err(ConfigError::InvalidJwksUrl(format!(
                "AUTH0_JWKS_URL must be an http:// or https:// URL, got '{}'",
                jwks_url
            )));
        }

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs()
        };

        let jwks_fetch_timeout_seconds =
            if let Some(value_str) = vars.get("JWKS_FETCH_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 || value > MAX_FETCH_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                        MAX_FETCH_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_FETCH_TIMEOUT_SECONDS
            };

        let jwt_audience = optional_non_empty(vars, "JWT_AUDIENCE")?;
        let jwt_issuer = optional_non_empty(vars, "JWT_ISSUER")?;

        Ok(Config {
            jwks_url,
            bind_address,
            jwt_clock_skew_seconds,
            jwks_fetch_timeout: Duration::from_secs(jwks_fetch_timeout_seconds),
            jwt_audience,
            jwt_issuer,
        })
    }
}

fn optional_non_empty(
    vars: &HashMap<String, String>,
    name: &str,
) -> Result<Option<String>, ConfigError> {
    match vars.get(name) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(ConfigError::InvalidClaimRequirement(
            format!("{} must not be empty when set", name),
        )),
        Some(value) => Ok(Some(value.trim().to_string())),
    }
}
