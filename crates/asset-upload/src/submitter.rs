//! Single submission call
//!
//! Builds the multipart upload for one request under one credential. There is
//! no retry here and the quota cache is never touched; both belong to the
//! orchestrator.

use std::sync::Arc;

use cloud_api::{AssetService, AssetType, AssetUpload, CreateAssetRequest, CreationContext};
use quota_pool::Credential;
use tracing::info;

use crate::error::{Result, UploadError};
use crate::request::SubmissionRequest;

/// Handle of an accepted submission, polled until done.
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: String,
    pub credential: Credential,
}

/// Submits assets of one asset type.
#[derive(Clone)]
pub struct AssetSubmitter {
    service: Arc<dyn AssetService>,
    asset_type: AssetType,
    description: String,
}

impl AssetSubmitter {
    pub fn new(
        service: Arc<dyn AssetService>,
        asset_type: AssetType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            service,
            asset_type,
            description: description.into(),
        }
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub async fn submit(
        &self,
        request: &SubmissionRequest,
        credential: &Credential,
    ) -> Result<Operation> {
        let payload = request.read_payload().await?;

        let upload = AssetUpload {
            request: CreateAssetRequest {
                asset_type: self.asset_type,
                display_name: request.display_name.clone(),
                description: self.description.clone(),
                creation_context: CreationContext {
                    creator: request.owner.clone(),
                },
            },
            file_name: request.file_name.clone(),
            content_type: request.content_type.clone(),
            payload,
        };

        let id = self
            .service
            .create_asset(credential.api_key().expose(), upload)
            .await
            .map_err(UploadError::Submission)?;

        info!(
            credential = credential.name(),
            operation_id = %id,
            asset = %request.display_name,
            "asset submitted"
        );

        Ok(Operation {
            id,
            credential: credential.clone(),
        })
    }
}
