// ABOUTME: Authentication context for API requests
// ABOUTME: Resolves the acting user from the X-User-Id header or the configured dev user

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::db::DbState;
use crate::response::ApiError;

/// Header carrying the authenticated user's id, set by the upstream gateway
pub const USER_ID_HEADER: &str = "x-user-id";

/// Current authenticated user
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
}

impl CurrentUser {
    fn from_header(parts: &Parts) -> Option<Self> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Self { id: id.to_string() })
    }
}

impl FromRequestParts<DbState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &DbState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = Self::from_header(parts) {
            return Ok(user);
        }

        match &state.dev_user {
            Some(id) => Ok(Self { id: id.to_string() }),
            None => Err(ApiError::Unauthorized),
        }
    }
}
