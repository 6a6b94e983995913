//! Caller identity extractor.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user's id in the `x-user-id` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use mylist_core::{EntityIdType, UserId};

use crate::constants::USER_ID_HEADER;
use crate::error::ApiError;

/// The user the request acts for.
///
/// Rejects with `MISSING_USER` when the header is absent or empty and with
/// `INVALID_ID` when it is not a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = match parts.headers.get(USER_ID_HEADER) {
            Some(value) => value
                .to_str()
                .map_err(|_| ApiError::invalid_id(USER_ID_HEADER, "<non-ascii>"))?,
            None => return Err(ApiError::missing_user()),
        };
        if raw.trim().is_empty() {
            return Err(ApiError::missing_user());
        }

        UserId::parse_field(USER_ID_HEADER, raw)
            .map(CurrentUser)
            .map_err(|_| ApiError::invalid_id(USER_ID_HEADER, raw))
    }
}
