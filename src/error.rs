//! Error types for backend calls.

use thiserror::Error;

/// Result alias for backend calls.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the health-check backend.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The request never produced a response (DNS, refused, reset).
    #[error("Connection failed: {0}")]
    Transport(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Credentials missing, rejected or expired.
    #[error("Authentication required")]
    Unauthorized,

    /// The requested service does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend answered with a non-success status.
    #[error("Backend returned {code}: {message}")]
    Status { code: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Whether the backend itself rejected the request (as opposed to the
    /// request never reaching it).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ClientError::Unauthorized | ClientError::NotFound(_) | ClientError::Status { .. }
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}
