//! Per-asset error taxonomy
//!
//! None of these abort a batch: the orchestrator turns every one of them into
//! an `UploadResult`.

use cloud_api::ErrorClassification;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Content type does not match the configured asset type. Never retried.
    #[error("not a valid {asset_type} file ({content_type})")]
    Validation {
        asset_type: String,
        content_type: String,
    },

    /// Every credential reports zero remaining quota. Terminal for the asset.
    #[error("all credentials exhausted")]
    QuotaExhausted,

    /// The staged payload could not be read back.
    #[error("reading payload: {0}")]
    Payload(#[from] std::io::Error),

    /// The service rejected the submission or could not be reached.
    #[error("submission failed: {0}")]
    Submission(cloud_api::Error),

    /// A status poll failed. Counted as a failed attempt.
    #[error("operation poll failed: {0}")]
    PollTransport(cloud_api::Error),

    /// The operation did not finish before the poll deadline.
    #[error("operation {operation_id} still pending after {waited_secs}s")]
    PollTimeout {
        operation_id: String,
        waited_secs: u64,
    },
}

impl UploadError {
    /// Whether the remote signalled that the key's quota is used up.
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            UploadError::Submission(e) => e.classification() == ErrorClassification::QuotaExceeded,
            _ => false,
        }
    }

    /// Whether the remote refused the key or the payload outright, so the same
    /// key will not do better on a retry.
    pub fn is_permanent(&self) -> bool {
        match self {
            UploadError::Submission(e) | UploadError::PollTransport(e) => {
                e.classification() == ErrorClassification::Permanent
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, UploadError>;
