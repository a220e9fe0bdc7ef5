//! Caller identification for API requests.
//!
//! Filebox sits behind an identity gateway that authenticates users and forwards the result
//! as request headers. These helpers turn those headers into a core [`Identity`], and
//! optionally check a shared API key proving the request came through the gateway.

use filebox_core::{Identity, UserId};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("invalid {0} header")]
    InvalidHeader(&'static str),
    #[error("invalid API key")]
    InvalidApiKey,
}

/// Validates the provided API key against the configured one.
///
/// With no key configured every request passes.
pub fn validate_api_key(expected: Option<&str>, provided: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match provided {
        None => Err(AuthError::MissingHeader(API_KEY_HEADER)),
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(AuthError::InvalidApiKey),
    }
}

/// Builds the caller identity from the `x-user-id` and `x-user-name` header values.
pub fn parse_identity(user_id: Option<&str>, user_name: Option<&str>) -> Result<Identity, AuthError> {
    let user_id: UserId = user_id
        .ok_or(AuthError::MissingHeader(USER_ID_HEADER))?
        .parse()
        .map_err(|_| AuthError::InvalidHeader(USER_ID_HEADER))?;
    let user_name = user_name.ok_or(AuthError::MissingHeader(USER_NAME_HEADER))?;

    Identity::new(user_id, user_name).map_err(|_| AuthError::InvalidHeader(USER_NAME_HEADER))
}
