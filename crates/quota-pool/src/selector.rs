//! Priority-ordered credential selection
//!
//! Walks the credentials in the order given and returns the first one whose
//! quota is not known to be exhausted. A credential without a fresh cached
//! snapshot is probed and the result cached before it is judged. There is no
//! round-robin state: with the same cache contents, the same credential wins.

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::QuotaCache;
use crate::credential::Credential;
use crate::probe::QuotaProbe;

/// Picks the highest-priority credential with remaining capacity.
#[derive(Clone)]
pub struct CredentialSelector {
    cache: Arc<QuotaCache>,
    probe: QuotaProbe,
}

impl CredentialSelector {
    pub fn new(cache: Arc<QuotaCache>, probe: QuotaProbe) -> Self {
        Self { cache, probe }
    }

    pub fn cache(&self) -> &Arc<QuotaCache> {
        &self.cache
    }

    /// First credential in `credentials` with `remaining != 0`.
    ///
    /// Returns `None` when every credential reports zero remaining, which is
    /// the exhaustion condition.
    pub async fn select(&self, credentials: &[Credential]) -> Option<Credential> {
        for credential in credentials {
            let snapshot = match self.cache.get(credential).await {
                Some(snapshot) => snapshot,
                None => {
                    let snapshot = self.probe.probe(credential).await;
                    self.cache.put(credential, snapshot).await;
                    snapshot
                }
            };

            if snapshot.has_capacity() {
                debug!(
                    credential = credential.name(),
                    remaining = snapshot.remaining,
                    "credential selected"
                );
                return Some(credential.clone());
            }

            debug!(
                credential = credential.name(),
                "credential exhausted, trying next"
            );
        }

        info!(
            credentials = credentials.len(),
            "all credentials exhausted"
        );
        None
    }
}
