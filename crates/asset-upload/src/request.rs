//! Assets waiting to be uploaded
//!
//! A `SubmissionRequest` owns its payload. When the intake staged the
//! attachment to a temporary file, the file lives exactly as long as the
//! request: the orchestrator takes requests by value, so the file is removed
//! on every exit path, success or error.

use std::path::Path;

use bytes::Bytes;
use cloud_api::Creator;
use tempfile::NamedTempFile;

/// Longest display name the service accepts, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 50;

/// Asset bytes, in memory or staged on disk.
#[derive(Debug)]
pub enum Payload {
    Memory(Bytes),
    Staged(NamedTempFile),
}

/// One asset ready for submission.
#[derive(Debug)]
pub struct SubmissionRequest {
    pub display_name: String,
    pub file_name: String,
    pub content_type: String,
    /// Owner the created asset is attributed to.
    pub owner: Creator,
    pub payload: Payload,
}

impl SubmissionRequest {
    /// Request over in-memory bytes. The display name is derived from
    /// `file_name`.
    pub fn from_bytes(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        owner: Creator,
        bytes: Bytes,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            display_name: display_name_for(&file_name),
            file_name,
            content_type: content_type.into(),
            owner,
            payload: Payload::Memory(bytes),
        }
    }

    /// Write `bytes` to a fresh temporary file and build a request over it.
    pub async fn stage(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        owner: Creator,
        bytes: Bytes,
    ) -> std::io::Result<Self> {
        let file_name = file_name.into();
        let staged = tempfile::Builder::new().prefix("asset-").tempfile()?;
        tokio::fs::write(staged.path(), &bytes).await?;
        Ok(Self {
            display_name: display_name_for(&file_name),
            file_name,
            content_type: content_type.into(),
            owner,
            payload: Payload::Staged(staged),
        })
    }

    /// Path of the staged file, if any.
    pub fn staged_path(&self) -> Option<&Path> {
        match &self.payload {
            Payload::Staged(file) => Some(file.path()),
            Payload::Memory(_) => None,
        }
    }

    /// Payload bytes. Staged files are read again on every call so a retry
    /// always sends the full content.
    pub async fn read_payload(&self) -> std::io::Result<Bytes> {
        match &self.payload {
            Payload::Memory(bytes) => Ok(bytes.clone()),
            Payload::Staged(file) => tokio::fs::read(file.path()).await.map(Bytes::from),
        }
    }
}

/// File stem, capped at `MAX_DISPLAY_NAME_CHARS`. Falls back to `"asset"`.
pub fn display_name_for(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("asset");
    stem.chars().take(MAX_DISPLAY_NAME_CHARS).collect()
}
