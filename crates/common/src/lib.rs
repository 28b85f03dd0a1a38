//! Common utilities and types shared across the authorizer crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (size limits, shape checks, header inspection)
pub mod jwt;
