//! Service-specific error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Reasons an intake request is refused before any asset is processed.
///
/// Per-asset failures never show up here; they become report lines.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("malformed multipart body: {0}")]
    Multipart(String),

    #[error("missing channel_id field")]
    MissingChannel,

    #[error("channel {0} is not allowed to submit uploads")]
    ChannelNotAllowed(String),

    #[error("no attachments in request")]
    NoAttachments,

    #[error("failed to stage attachment: {0}")]
    Staging(#[from] std::io::Error),
}

impl IntakeError {
    pub fn status(&self) -> StatusCode {
        match self {
            IntakeError::Multipart(_) | IntakeError::MissingChannel | IntakeError::NoAttachments => {
                StatusCode::BAD_REQUEST
            }
            IntakeError::ChannelNotAllowed(_) => StatusCode::FORBIDDEN,
            IntakeError::Staging(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON error body: {"error":{"type":"intake_error","message":"...","request_id":"req_..."}}
    pub fn into_response_with_id(self, request_id: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "type": "intake_error",
                "message": self.to_string(),
                "request_id": request_id,
            }
        });
        (
            self.status(),
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

/// Result alias using the intake error
pub type Result<T> = std::result::Result<T, IntakeError>;
