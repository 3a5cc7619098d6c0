// ABOUTME: Shared API response types and error handling
// ABOUTME: Confirmation bodies and the mapping of CAP errors to HTTP status codes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use cap_records::CapError;

/// Confirmation message, optionally carrying the affected record
#[derive(Debug, Serialize)]
pub struct MessageResponse<T> {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<T>,
}

impl<T> MessageResponse<T> {
    pub fn with_item(message: &'static str, item: T) -> Self {
        Self {
            message,
            item: Some(item),
        }
    }
}

impl MessageResponse<()> {
    pub fn new(message: &'static str) -> Self {
        Self {
            message,
            item: None,
        }
    }
}

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors a handler can answer with
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,

    #[error(transparent)]
    Cap(#[from] CapError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Cap(CapError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Cap(CapError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Cap(CapError::InvalidTransition(_)) => StatusCode::CONFLICT,
            ApiError::Cap(CapError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        let request_id = Uuid::new_v4().to_string();

        if status.is_server_error() {
            error!(
                request_id = %request_id,
                status = status.as_u16(),
                error = %message,
                "Request failed"
            );
        } else {
            info!(
                request_id = %request_id,
                status = status.as_u16(),
                error = %message,
                "Request rejected"
            );
        }

        (status, ResponseJson(ErrorBody { error: message })).into_response()
    }
}
