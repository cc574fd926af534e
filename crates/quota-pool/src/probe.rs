//! Remote quota lookup
//!
//! A probe never fails from the caller's point of view. When the quota
//! endpoint is unreachable or answers with something unusable, the probe
//! returns an "unknown" snapshot, which selection treats as available
//! (fail-open), so an outage of the quota endpoint alone never blocks uploads.
//! Each fallback is logged at `warn` and counted in
//! `quota_probe_failures_total`.

use std::sync::Arc;
use std::time::Duration;

use cloud_api::{AssetService, QuotaQuery};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::QuotaSnapshot;
use crate::credential::Credential;

/// Reads a credential's current capacity/usage from the asset service.
#[derive(Clone)]
pub struct QuotaProbe {
    service: Arc<dyn AssetService>,
    query: QuotaQuery,
    cache_period: Duration,
}

impl QuotaProbe {
    /// `cache_period` is how long a probed snapshot stays fresh; it should
    /// match the provider's quota reset cadence.
    pub fn new(service: Arc<dyn AssetService>, query: QuotaQuery, cache_period: Duration) -> Self {
        Self {
            service,
            query,
            cache_period,
        }
    }

    pub fn cache_period(&self) -> Duration {
        self.cache_period
    }

    /// Probe `credential`. Only the first quota entry of the report is used.
    pub async fn probe(&self, credential: &Credential) -> QuotaSnapshot {
        let result = self
            .service
            .fetch_quota(credential.api_key().expose(), &self.query)
            .await;
        let valid_until = Instant::now() + self.cache_period;

        let failure = match result {
            Ok(report) => match report.quotas.first() {
                Some(entry) => {
                    let snapshot = QuotaSnapshot::known(entry.capacity, entry.usage, valid_until);
                    debug!(
                        credential = credential.name(),
                        capacity = entry.capacity,
                        usage = entry.usage,
                        remaining = snapshot.remaining,
                        "quota probed"
                    );
                    return snapshot;
                }
                None => String::from("quota report contained no entries"),
            },
            Err(e) => e.to_string(),
        };

        warn!(
            credential = credential.name(),
            error = %failure,
            "quota probe failed, assuming capacity is available"
        );
        metrics::counter!("quota_probe_failures_total", "credential" => credential.name().to_string())
            .increment(1);
        QuotaSnapshot::unknown(valid_until)
    }
}
