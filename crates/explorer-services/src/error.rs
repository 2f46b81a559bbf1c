//! Backend-specific error types.

use explorer_core::{AppError, NetworkError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl BackendError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "The requested record was not found.",
            Self::InvalidRequest(_) => "The request could not be built. Check your settings.",
            Self::Network(e) => e.user_message(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// HTTP status behind this error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound(_) => Some(404),
            Self::InvalidRequest(_) => None,
            Self::Network(e) => e.status(),
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Network(e) => AppError::Network(e),
            other => AppError::Service(other.to_string()),
        }
    }
}
