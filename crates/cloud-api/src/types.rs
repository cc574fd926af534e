//! Wire types for the assets API

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};

/// Asset categories accepted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetType {
    Audio,
    Decal,
    Model,
    Video,
}

impl AssetType {
    /// Content types the service accepts for this asset type.
    pub fn content_types(&self) -> &'static [&'static str] {
        match self {
            AssetType::Audio => &["audio/mpeg", "audio/ogg", "audio/wav", "audio/flac"],
            AssetType::Decal => &["image/png", "image/jpeg", "image/bmp", "image/tga"],
            AssetType::Model => &["model/fbx", "model/gltf-binary", "model/obj"],
            AssetType::Video => &["video/mp4", "video/mov"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Audio => "Audio",
            AssetType::Decal => "Decal",
            AssetType::Model => "Model",
            AssetType::Video => "Video",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner recorded on a created asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Creator {
    GroupId(String),
    UserId(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct CreationContext {
    pub creator: Creator,
}

/// JSON part of the multipart submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    pub asset_type: AssetType,
    pub display_name: String,
    pub description: String,
    pub creation_context: CreationContext,
}

/// Everything needed for one `create_asset` call.
#[derive(Debug, Clone)]
pub struct AssetUpload {
    pub request: CreateAssetRequest,
    pub file_name: String,
    pub content_type: String,
    pub payload: Bytes,
}

/// Parameters of a quota lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaQuery {
    pub resource_type: String,
    pub asset_type: AssetType,
}

impl QuotaQuery {
    /// Upload rate quota for `asset_type`.
    pub fn uploads(asset_type: AssetType) -> Self {
        Self {
            resource_type: "RateLimitUpload".into(),
            asset_type,
        }
    }
}

/// Quota list returned by the quota endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotaReport {
    #[serde(default)]
    pub quotas: Vec<QuotaEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaEntry {
    pub capacity: i64,
    pub usage: i64,
    #[serde(default)]
    pub period: Option<String>,
}

/// Body of a successful submission: `path` is `operations/<id>`.
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedOperation {
    pub path: String,
}

impl CreatedOperation {
    /// Final path segment, the operation id.
    pub(crate) fn operation_id(&self) -> Option<&str> {
        self.path
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
    }
}

/// Status of a long-running operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub response: Option<OperationResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    #[serde(default, deserialize_with = "string_or_number")]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub moderation_result: Option<ModerationResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResult {
    #[serde(default)]
    pub moderation_state: Option<String>,
}

impl OperationStatus {
    pub fn asset_id(&self) -> Option<&str> {
        self.response.as_ref()?.asset_id.as_deref()
    }

    pub fn moderation_state(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .moderation_result
            .as_ref()?
            .moderation_state
            .as_deref()
    }
}

/// Asset ids arrive as strings, but older responses carry bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
