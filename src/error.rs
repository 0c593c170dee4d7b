/// Unified error types for the file relay
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the relay
///
/// The first group of variants is the storage core's taxonomy. `Config` and
/// `Internal` belong to the surrounding application.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Upload body was malformed or could not be read to completion
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upload body exceeded the configured size limit
    #[error("Upload exceeds maximum size of {limit} bytes")]
    TooLarge { limit: u64 },

    /// Stored name failed path-safety validation
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// No object under a valid-looking name
    #[error("Not found: {0}")]
    NotFound(String),

    /// Every generated name collided with an existing object
    #[error("Storage exhausted after {attempts} name collisions")]
    StorageExhausted { attempts: usize },

    /// I/O failure while writing or committing an upload
    #[error("Write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// I/O failure while opening or inspecting a stored object
    #[error("Read failed: {0}")]
    ReadFailed(#[source] std::io::Error),

    /// The OS random source could not be read
    #[error("Randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl RelayError {
    /// Status code and machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            RelayError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "InvalidRequest"),
            RelayError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "PayloadTooLarge"),
            // Invalid names look exactly like missing ones from the outside
            RelayError::InvalidIdentifier(_) | RelayError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "NotFound")
            }
            RelayError::StorageExhausted { .. }
            | RelayError::WriteFailed(_)
            | RelayError::ReadFailed(_)
            | RelayError::RandomnessUnavailable(_)
            | RelayError::Config(_)
            | RelayError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError")
            }
        }
    }
}

/// Convert RelayError to HTTP response
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let message = match &self {
            RelayError::InvalidInput(_) | RelayError::TooLarge { .. } => self.to_string(),
            RelayError::InvalidIdentifier(_) | RelayError::NotFound(_) => {
                "File not found".to_string()
            }
            _ => "Internal server error".to_string(), // Don't leak paths
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
