//! Custom Axum extractors.
//!
//! - [`Caller`]: the calling user, from the `X-User-Id` header
//!
//! # Example
//!
//! ```ignore
//! async fn handler(Caller(user_id): Caller) -> String {
//!     format!("Hello {user_id}")
//! }
//! ```

use crate::error::AppError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use waiting_room_core::UserId;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the calling user.
///
/// Authentication happens upstream; this service trusts the header. A missing
/// or non-UUID value is rejected with `400 BAD_REQUEST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::bad_request("Missing X-User-Id header"))?;

        value
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<UserId>().ok())
            .map(Caller)
            .ok_or_else(|| AppError::bad_request("X-User-Id must be a UUID"))
    }
}
