use cap_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by CAP operations
#[derive(Error, Debug)]
pub enum CapError {
    /// Absent, or owned by someone else
    #[error("CAP not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    InvalidTransition(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<sqlx::Error> for CapError {
    fn from(err: sqlx::Error) -> Self {
        CapError::Storage(StorageError::Sqlx(err))
    }
}

impl From<serde_json::Error> for CapError {
    fn from(err: serde_json::Error) -> Self {
        CapError::Storage(StorageError::Json(err))
    }
}

pub type CapResult<T> = Result<T, CapError>;
