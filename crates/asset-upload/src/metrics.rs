//! Upload metrics
//!
//! Recorded through the `metrics` facade; the gateway binary installs the
//! Prometheus exporter. Without a recorder every call is a no-op.
//!
//! - `asset_uploads_total` (counter): label `status` (success | rejected | failed)
//! - `asset_upload_attempts_total` (counter): label `credential`
//! - `asset_upload_duration_seconds` (histogram): label `status`

/// Record a finished asset with its final status.
pub fn record_upload(status: &'static str, duration_secs: f64) {
    metrics::counter!("asset_uploads_total", "status" => status).increment(1);
    metrics::histogram!("asset_upload_duration_seconds", "status" => status)
        .record(duration_secs);
}

/// Record one submission attempt against `credential`.
pub fn record_attempt(credential: &str) {
    metrics::counter!("asset_upload_attempts_total", "credential" => credential.to_string())
        .increment(1);
}
