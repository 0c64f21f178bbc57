//! # API Shared
//!
//! Shared utilities and definitions for the MindCare HTTP API.
//!
//! Contains:
//! - Wire types (`dto` module) with OpenAPI schemas
//! - Bearer-token verification (`auth` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the operator CLI.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{AuthError, TokenClaims, TokenVerifier};
pub use health::HealthService;
