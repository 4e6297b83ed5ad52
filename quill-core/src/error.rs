//! Core error types

use thiserror::Error;

use crate::storage::StorageError;
use quill_ipc::IpcError;

/// Fatal errors that terminate the core process.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("ipc failure: {0}")]
    Ipc(#[from] IpcError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Business-handler failures. Every variant maps onto a numeric status code
/// carried in an ERROR reply payload; handlers never unwind across the
/// worker loop.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    pub fn status_code(&self) -> u16 {
        match self {
            HandlerError::BadRequest(_) => 400,
            HandlerError::Unauthorized(_) => 401,
            HandlerError::Forbidden(_) => 403,
            HandlerError::NotFound(_) => 404,
            HandlerError::Conflict(_) => 409,
            HandlerError::Internal(_) => 500,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        HandlerError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        HandlerError::Unauthorized(message.into())
    }
}

impl From<StorageError> for HandlerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => HandlerError::NotFound(format!("{} not found", what)),
            StorageError::Conflict(message) => HandlerError::Conflict(message),
            other => HandlerError::Internal(other.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for HandlerError {
    fn from(err: bcrypt::BcryptError) -> Self {
        HandlerError::Internal(format!("password hashing failed: {}", err))
    }
}
