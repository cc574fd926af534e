//! Per-asset retry loop
//!
//! Each asset goes through validate → select → submit → poll. A failed
//! submit or poll counts as one attempt; after a fixed backoff the key is
//! selected again from scratch, so the retry may land on the same key or on
//! the next one depending on cached quota. A key the remote refuses outright
//! (bad key, rejected payload) is skipped for the rest of the asset. Running
//! out of keys ends the asset at once and is never retried.

use std::sync::Arc;
use std::time::Duration;

use cloud_api::AssetType;
use quota_pool::{Credential, CredentialSelector, CredentialSet, QuotaCache};
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::error::UploadError;
use crate::media;
use crate::metrics;
use crate::poller::{Completion, OperationPoller};
use crate::report::UploadResult;
use crate::request::SubmissionRequest;
use crate::submitter::AssetSubmitter;

/// Default submission attempts per asset.
pub const DEFAULT_MAX_RETRY: u32 = 3;

/// Default wait between attempts.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(2000);

/// Retry policy and asset type for a pipeline.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub asset_type: AssetType,
    pub max_retry: u32,
    pub retry_backoff: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            asset_type: AssetType::Audio,
            max_retry: DEFAULT_MAX_RETRY,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Runs assets through the upload pipeline.
pub struct UploadOrchestrator {
    credentials: CredentialSet,
    selector: CredentialSelector,
    submitter: AssetSubmitter,
    poller: OperationPoller,
    settings: UploadSettings,
}

impl UploadOrchestrator {
    pub fn new(
        credentials: CredentialSet,
        selector: CredentialSelector,
        submitter: AssetSubmitter,
        poller: OperationPoller,
        settings: UploadSettings,
    ) -> Self {
        Self {
            credentials,
            selector,
            submitter,
            poller,
            settings,
        }
    }

    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    pub fn cache(&self) -> &Arc<QuotaCache> {
        self.selector.cache()
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Process a batch strictly in order. One failing asset never stops the
    /// rest.
    pub async fn process_batch(&self, requests: Vec<SubmissionRequest>) -> Vec<UploadResult> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.process(request).await);
        }
        results
    }

    /// Process one asset. The request, and any staged file behind it, is
    /// dropped before this returns.
    #[instrument(skip_all, fields(asset = %request.display_name))]
    pub async fn process(&self, request: SubmissionRequest) -> UploadResult {
        let started = Instant::now();
        let result = self.run(&request).await;
        drop(request);

        metrics::record_upload(result.status.kind(), started.elapsed().as_secs_f64());
        info!(
            status = %result.status.label(),
            asset_id = result.asset_id.as_deref().unwrap_or("-"),
            credential = result.credential_name.as_deref().unwrap_or("-"),
            attempts = result.attempts,
            "asset finished"
        );
        result
    }

    async fn run(&self, request: &SubmissionRequest) -> UploadResult {
        let name = request.display_name.clone();

        if let Err(e) = media::validate(self.settings.asset_type, &request.content_type) {
            return UploadResult::rejected(name, e);
        }

        let max_retry = self.settings.max_retry;
        let mut attempts = 0u32;
        let mut last_credential: Option<String> = None;
        let mut last_error: Option<String> = None;
        // Keys the remote refused outright for this asset.
        let mut refused: Vec<String> = Vec::new();

        while attempts < max_retry {
            let candidates: Vec<Credential> = self
                .credentials
                .as_slice()
                .iter()
                .filter(|c| !refused.iter().any(|name| name == c.name()))
                .cloned()
                .collect();
            if candidates.is_empty() {
                let summary = last_error.unwrap_or_else(|| UploadError::QuotaExhausted.to_string());
                return UploadResult::failed(name, summary, last_credential.as_deref(), attempts);
            }

            let Some(credential) = self.selector.select(&candidates).await else {
                return UploadResult::failed(
                    name,
                    UploadError::QuotaExhausted,
                    last_credential.as_deref(),
                    attempts,
                );
            };

            metrics::record_attempt(credential.name());
            match self.attempt(request, &credential).await {
                Ok(completion) => {
                    attempts += 1;
                    self.cache().decrement(&credential).await;
                    return UploadResult::succeeded(
                        name,
                        completion.asset_id,
                        completion.moderation_state,
                        credential.name(),
                        attempts,
                    );
                }
                Err(e) => {
                    attempts += 1;
                    if e.is_quota_exceeded() {
                        self.cache().invalidate(&credential).await;
                    }
                    if e.is_permanent() {
                        refused.push(credential.name().to_string());
                    }

                    if attempts >= max_retry {
                        warn!(
                            credential = credential.name(),
                            attempts,
                            error = %e,
                            "upload failed, no attempts left"
                        );
                        return UploadResult::failed(name, e, Some(credential.name()), attempts);
                    }

                    warn!(
                        credential = credential.name(),
                        attempt = attempts,
                        max_retry,
                        refused = e.is_permanent(),
                        backoff_ms = u64::try_from(self.settings.retry_backoff.as_millis())
                            .unwrap_or(u64::MAX),
                        error = %e,
                        "upload attempt failed, retrying"
                    );
                    last_credential = Some(credential.name().to_string());
                    last_error = Some(e.to_string());
                    tokio::time::sleep(self.settings.retry_backoff).await;
                }
            }
        }

        UploadResult::failed(name, "no upload attempts permitted", None, attempts)
    }

    async fn attempt(
        &self,
        request: &SubmissionRequest,
        credential: &Credential,
    ) -> crate::Result<Completion> {
        let operation = self.submitter.submit(request, credential).await?;
        self.poller.await_completion(&operation).await
    }
}
