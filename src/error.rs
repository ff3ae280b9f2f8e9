/// Unified error types for Screendiff
use crate::diff::DiffError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// A required request field was not supplied
    #[error("{0}")]
    MissingInput(String),

    /// Request fields were present but unusable together
    #[error("{0}")]
    InvalidInput(String),

    /// A compare request named uploads that do not exist
    #[error("{0}")]
    InvalidReference(String),

    /// Not found errors
    #[error("{0}")]
    NotFound(String),

    /// Blob storage errors
    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    /// Image comparison failed
    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error body returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ServiceError {
    /// HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MissingInput(_) | ServiceError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::InvalidReference(_) | ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::BlobStorage(_)
            | ServiceError::Diff(_)
            | ServiceError::Internal(_)
            | ServiceError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert ServiceError to HTTP response
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request_failed");
            "Internal server error".to_string() // Don't leak details
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
