//! Upload pipeline for one batch of assets
//!
//! Takes staged assets from the intake, picks an API key with quota left,
//! submits each asset, waits for the remote operation to finish and turns the
//! outcome into a report line. Assets of a batch are handled one after the
//! other; retries re-select the key, so a failure on one key may move the
//! asset to the next one once the first runs dry.
//!
//! Per-asset flow:
//! 1. Content type checked against the configured asset type → `Rejected` on mismatch
//! 2. `CredentialSelector` picks a key → `Failed` when every key is exhausted
//! 3. `AssetSubmitter` creates the asset → operation id
//! 4. `OperationPoller` waits for the operation → asset id + moderation state
//! 5. Success decrements the cached quota; failures back off and retry up to `max_retry`

pub mod error;
pub mod media;
pub mod metrics;
pub mod orchestrator;
pub mod poller;
pub mod report;
pub mod request;
pub mod submitter;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, UploadError};
pub use orchestrator::{UploadOrchestrator, UploadSettings};
pub use poller::{Completion, OperationPoller};
pub use report::{UploadResult, UploadStatus, render_report};
pub use request::{Payload, SubmissionRequest};
pub use submitter::{AssetSubmitter, Operation};
