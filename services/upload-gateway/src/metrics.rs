//! Prometheus metrics exposition
//!
//! Installs the recorder behind every `metrics::` call in the workspace:
//!
//! - `gateway_requests_total` (counter): label `status`
//! - `asset_uploads_total` (counter): label `status`, from the pipeline
//! - `asset_upload_attempts_total` (counter): label `credential`, from the pipeline
//! - `asset_upload_duration_seconds` (histogram), from the pipeline
//! - `quota_probe_failures_total` (counter): label `credential`, from the quota pool

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Buckets from 100ms to 30min. An asset that sits in moderation polling for
/// its whole deadline still lands in a finite bucket.
const UPLOAD_DURATION_BUCKETS: &[f64] = &[
    0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
];

fn builder() -> Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("asset_upload_duration_seconds".to_string()),
            UPLOAD_DURATION_BUCKETS,
        )
        .context("failed to set histogram buckets")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle> {
    builder()?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Record a finished intake request.
pub fn record_request(status: u16) {
    metrics::counter!("gateway_requests_total", "status" => status.to_string()).increment(1);
}
