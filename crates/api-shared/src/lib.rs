//! # API Shared
//!
//! Shared utilities and definitions for Filebox APIs.
//!
//! Contains:
//! - Request/response DTOs with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - Caller identity and API key checks
//!
//! Used by `api-rest` and usable by any other transport.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{parse_identity, validate_api_key, AuthError, API_KEY_HEADER, USER_ID_HEADER, USER_NAME_HEADER};
pub use dto::*;
pub use health::HealthService;
