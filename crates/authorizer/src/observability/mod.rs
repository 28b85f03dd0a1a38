//! Observability for the authorizer: Prometheus metrics definitions.

pub mod metrics;
