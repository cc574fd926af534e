//! Content type validation

use cloud_api::AssetType;

use crate::error::{Result, UploadError};

/// Check a declared content type against what `asset_type` accepts.
///
/// Parameters (`; charset=...`) are ignored and matching is case-insensitive.
pub fn validate(asset_type: AssetType, content_type: &str) -> Result<()> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if asset_type.content_types().contains(&essence.as_str()) {
        Ok(())
    } else {
        Err(UploadError::Validation {
            asset_type: asset_type.to_string(),
            content_type: content_type.to_string(),
        })
    }
}
