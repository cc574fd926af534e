//! Per-asset results and the batch reply

use std::fmt::Write as _;

/// Longest error summary carried into a report, in characters.
pub const MAX_SUMMARY_CHARS: usize = 120;

/// Final status of one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    /// Operation finished; label is the moderation state.
    Success { moderation_state: String },
    /// Asset never left the gateway (wrong media type).
    Rejected { reason: String },
    /// Every permitted attempt failed, or no key had quota left.
    Failed { summary: String },
}

impl UploadStatus {
    /// Uppercased label shown in the report.
    pub fn label(&self) -> String {
        match self {
            UploadStatus::Success { moderation_state } => moderation_state.to_uppercase(),
            UploadStatus::Rejected { .. } => "REJECTED".into(),
            UploadStatus::Failed { .. } => "FAILED".into(),
        }
    }

    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            UploadStatus::Success { .. } => "success",
            UploadStatus::Rejected { .. } => "rejected",
            UploadStatus::Failed { .. } => "failed",
        }
    }
}

/// Outcome of one asset. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub asset_name: String,
    pub asset_id: Option<String>,
    pub status: UploadStatus,
    /// Credential used by the final attempt, if any attempt was made.
    pub credential_name: Option<String>,
    /// Submission attempts made.
    pub attempts: u32,
}

impl UploadResult {
    pub fn succeeded(
        asset_name: String,
        asset_id: Option<String>,
        moderation_state: String,
        credential_name: &str,
        attempts: u32,
    ) -> Self {
        Self {
            asset_name,
            asset_id,
            status: UploadStatus::Success { moderation_state },
            credential_name: Some(credential_name.to_string()),
            attempts,
        }
    }

    pub fn rejected(asset_name: String, reason: impl ToString) -> Self {
        Self {
            asset_name,
            asset_id: None,
            status: UploadStatus::Rejected {
                reason: reason.to_string(),
            },
            credential_name: None,
            attempts: 0,
        }
    }

    pub fn failed(
        asset_name: String,
        error: impl ToString,
        credential_name: Option<&str>,
        attempts: u32,
    ) -> Self {
        Self {
            asset_name,
            asset_id: None,
            status: UploadStatus::Failed {
                summary: truncate(&error.to_string(), MAX_SUMMARY_CHARS),
            },
            credential_name: credential_name.map(str::to_string),
            attempts,
        }
    }
}

/// Cut `text` to `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Render the reply for a batch: one block per asset, in order.
///
/// ```text
/// **1. battle-theme**
/// ID: 123456
/// Status: APPROVED
/// Key: primary
/// ```
pub fn render_report(results: &[UploadResult]) -> String {
    let mut blocks = Vec::with_capacity(results.len());

    for (index, result) in results.iter().enumerate() {
        let mut block = String::new();
        let _ = writeln!(block, "**{}. {}**", index + 1, result.asset_name);
        let _ = writeln!(block, "ID: {}", result.asset_id.as_deref().unwrap_or("-"));
        let _ = write!(block, "Status: {}", result.status.label());
        match &result.status {
            UploadStatus::Rejected { reason } => {
                let _ = write!(block, "\nReason: {reason}");
            }
            UploadStatus::Failed { summary } => {
                let _ = write!(block, "\nError: {summary}");
            }
            UploadStatus::Success { .. } => {}
        }
        if let Some(name) = &result.credential_name {
            let _ = write!(block, "\nKey: {name}");
        }
        blocks.push(block);
    }

    blocks.join("\n\n")
}
