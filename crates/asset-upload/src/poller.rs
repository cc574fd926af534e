//! Operation status polling
//!
//! PENDING → poll → PENDING | DONE. Between polls the task sleeps for exactly
//! the poll interval with `tokio::time::sleep`, so other work keeps running.
//! A failed poll ends the wait immediately. The optional deadline bounds the
//! whole wait; without one an operation that never finishes is polled forever.

use std::sync::Arc;
use std::time::Duration;

use cloud_api::AssetService;
use tracing::{debug, warn};

use crate::error::{Result, UploadError};
use crate::submitter::Operation;

/// Moderation label used when a finished operation carries none.
pub const UNKNOWN_MODERATION_STATE: &str = "UNKNOWN";

/// Terminal outcome of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub asset_id: Option<String>,
    pub moderation_state: String,
}

#[derive(Clone)]
pub struct OperationPoller {
    service: Arc<dyn AssetService>,
    interval: Duration,
    deadline: Option<Duration>,
}

impl OperationPoller {
    pub fn new(service: Arc<dyn AssetService>, interval: Duration, deadline: Option<Duration>) -> Self {
        Self {
            service,
            interval,
            deadline,
        }
    }

    /// Poll `operation` until the service reports it done.
    pub async fn await_completion(&self, operation: &Operation) -> Result<Completion> {
        let Some(deadline) = self.deadline else {
            return self.poll_until_done(operation).await;
        };

        match tokio::time::timeout(deadline, self.poll_until_done(operation)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation_id = %operation.id,
                    deadline_secs = deadline.as_secs(),
                    "operation did not finish before deadline"
                );
                Err(UploadError::PollTimeout {
                    operation_id: operation.id.clone(),
                    waited_secs: deadline.as_secs(),
                })
            }
        }
    }

    async fn poll_until_done(&self, operation: &Operation) -> Result<Completion> {
        let api_key = operation.credential.api_key().expose();
        let mut polls = 0u32;

        loop {
            let status = self
                .service
                .get_operation(api_key, &operation.id)
                .await
                .map_err(UploadError::PollTransport)?;
            polls += 1;

            if status.done {
                let completion = Completion {
                    asset_id: status.asset_id().map(str::to_string),
                    moderation_state: status
                        .moderation_state()
                        .unwrap_or(UNKNOWN_MODERATION_STATE)
                        .to_string(),
                };
                debug!(
                    operation_id = %operation.id,
                    polls,
                    asset_id = ?completion.asset_id,
                    moderation_state = %completion.moderation_state,
                    "operation done"
                );
                return Ok(completion);
            }

            debug!(operation_id = %operation.id, polls, "operation pending");
            tokio::time::sleep(self.interval).await;
        }
    }
}
