//! Status classification for asset service responses
//!
//! The service signals an exhausted upload quota with 429. Key problems
//! (401/403) and payload problems (400/413/415/422) will fail again on any
//! retry with the same input. Everything else is treated as transient.

use crate::ErrorClassification;

/// Body phrases that mark a 4xx as a quota problem even without a 429.
const QUOTA_PATTERNS: &[&str] = &["quota", "rate limit", "too many requests"];

/// Classify a non-success response by HTTP status and body.
pub fn classify_status(status: u16, body: &str) -> ErrorClassification {
    match status {
        429 => ErrorClassification::QuotaExceeded,
        401 | 403 => ErrorClassification::Permanent,
        400 | 413 | 415 | 422 => {
            let lower = body.to_lowercase();
            if QUOTA_PATTERNS.iter().any(|p| lower.contains(p)) {
                ErrorClassification::QuotaExceeded
            } else {
                ErrorClassification::Permanent
            }
        }
        _ => ErrorClassification::Transient,
    }
}
