//! Error types for remote asset service calls

use crate::ErrorClassification;
use crate::classify::classify_status;

/// Errors from the remote asset service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The service answered with a non-success status.
    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Parse(String),
}

impl Error {
    /// How the caller should treat the credential that produced this error.
    pub fn classification(&self) -> ErrorClassification {
        match self {
            Error::Status { status, body } => classify_status(*status, body),
            Error::Http(_) | Error::Parse(_) => ErrorClassification::Transient,
        }
    }
}

/// Result alias for remote calls.
pub type Result<T> = std::result::Result<T, Error>;
