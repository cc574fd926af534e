//! Upload intake
//!
//! `POST /v1/uploads` takes a multipart body: a `channel_id` text field naming
//! where the batch came from, and one file field per attachment. The channel
//! is checked against the allowlist before anything touches disk. Accepted
//! attachments are staged to temporary files, run through the pipeline in
//! order, and answered with the plain-text report.

use std::sync::Arc;

use asset_upload::{SubmissionRequest, UploadOrchestrator, render_report};
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use cloud_api::Creator;
use tracing::{info, instrument, warn};

use crate::config::IntakeConfig;
use crate::error::{IntakeError, Result};
use crate::metrics;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

const CHANNEL_FIELD: &str = "channel_id";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Shared state for the intake handler
#[derive(Clone)]
pub struct IntakeState {
    pub orchestrator: Arc<UploadOrchestrator>,
    pub intake: Arc<IntakeConfig>,
    pub owner: Creator,
}

/// Attachment as received, before staging.
#[derive(Debug)]
struct Attachment {
    file_name: String,
    content_type: String,
    bytes: Bytes,
}

#[derive(Debug, Default)]
struct ParsedUpload {
    channel_id: Option<String>,
    attachments: Vec<Attachment>,
}

async fn parse(mut multipart: Multipart) -> Result<ParsedUpload> {
    let mut parsed = ParsedUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IntakeError::Multipart(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field
                .content_type()
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| IntakeError::Multipart(e.to_string()))?;
            parsed.attachments.push(Attachment {
                file_name,
                content_type,
                bytes,
            });
        } else if name == CHANNEL_FIELD {
            let text = field
                .text()
                .await
                .map_err(|e| IntakeError::Multipart(e.to_string()))?;
            parsed.channel_id = Some(text.trim().to_string());
        }
    }

    Ok(parsed)
}

async fn accept(state: &IntakeState, multipart: Multipart) -> Result<Vec<SubmissionRequest>> {
    let parsed = parse(multipart).await?;

    let channel_id = parsed
        .channel_id
        .filter(|c| !c.is_empty())
        .ok_or(IntakeError::MissingChannel)?;
    if !state.intake.allows(&channel_id) {
        return Err(IntakeError::ChannelNotAllowed(channel_id));
    }
    if parsed.attachments.is_empty() {
        return Err(IntakeError::NoAttachments);
    }

    info!(
        channel_id = %channel_id,
        attachments = parsed.attachments.len(),
        "upload batch accepted"
    );

    let mut requests = Vec::with_capacity(parsed.attachments.len());
    for attachment in parsed.attachments {
        let request = SubmissionRequest::stage(
            attachment.file_name,
            attachment.content_type,
            state.owner.clone(),
            attachment.bytes,
        )
        .await?;
        requests.push(request);
    }
    Ok(requests)
}

/// Handle one intake request end to end.
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn handle_upload(state: &IntakeState, multipart: Multipart, request_id: String) -> Response {
    let requests = match accept(state, multipart).await {
        Ok(requests) => requests,
        Err(e) => {
            warn!(error = %e, "upload request refused");
            metrics::record_request(e.status().as_u16());
            return e.into_response_with_id(&request_id);
        }
    };

    let results = state.orchestrator.process_batch(requests).await;
    metrics::record_request(StatusCode::OK.as_u16());

    (
        StatusCode::OK,
        [
            (axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (axum::http::header::HeaderName::from_static("x-request-id"), request_id.as_str()),
        ],
        render_report(&results),
    )
        .into_response()
}
