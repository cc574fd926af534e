//! reqwest-backed `AssetService`
//!
//! Endpoints, relative to the configured base URL:
//! - `GET  /assets/user/v1/quotas?resourceType=..&assetType=..`
//! - `POST /assets/v1/assets` (multipart: `request` JSON + `fileContent`)
//! - `GET  /assets/v1/operations/{id}`
//!
//! All three authenticate with the `x-api-key` header.

use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{AssetUpload, CreatedOperation, OperationStatus, QuotaQuery, QuotaReport};
use crate::{AssetService, BoxFuture};

/// Header carrying the credential's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Asset service client over HTTPS.
#[derive(Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    base_url: String,
}

impl CloudClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn quota(&self, api_key: &str, query: &QuotaQuery) -> Result<QuotaReport> {
        let response = self
            .http
            .get(self.url("/assets/user/v1/quotas"))
            .header(API_KEY_HEADER, api_key)
            .query(&[
                ("resourceType", query.resource_type.as_str()),
                ("assetType", query.asset_type.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format!("quota request failed: {e}")))?;

        let response = check_status(response).await?;
        response
            .json::<QuotaReport>()
            .await
            .map_err(|e| Error::Parse(format!("invalid quota response: {e}")))
    }

    async fn create(&self, api_key: &str, upload: AssetUpload) -> Result<String> {
        let request_json = serde_json::to_string(&upload.request)
            .map_err(|e| Error::Parse(format!("serializing asset request: {e}")))?;

        let request_part = Part::text(request_json)
            .mime_str("application/json")
            .map_err(|e| Error::Http(format!("building request part: {e}")))?;
        let file_part = Part::bytes(upload.payload.to_vec())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)
            .map_err(|e| Error::Http(format!("invalid content type {}: {e}", upload.content_type)))?;

        let form = Form::new()
            .part("request", request_part)
            .part("fileContent", file_part);

        debug!(
            file_name = %upload.file_name,
            bytes = upload.payload.len(),
            "submitting asset"
        );

        let response = self
            .http
            .post(self.url("/assets/v1/assets"))
            .header(API_KEY_HEADER, api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Http(format!("asset submission failed: {e}")))?;

        let response = check_status(response).await?;
        let created = response
            .json::<CreatedOperation>()
            .await
            .map_err(|e| Error::Parse(format!("invalid submission response: {e}")))?;

        created
            .operation_id()
            .map(str::to_string)
            .ok_or_else(|| Error::Parse(format!("no operation id in path {:?}", created.path)))
    }

    async fn operation(&self, api_key: &str, operation_id: &str) -> Result<OperationStatus> {
        let response = self
            .http
            .get(self.url(&format!("/assets/v1/operations/{operation_id}")))
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|e| Error::Http(format!("operation status request failed: {e}")))?;

        let response = check_status(response).await?;
        response
            .json::<OperationStatus>()
            .await
            .map_err(|e| Error::Parse(format!("invalid operation response: {e}")))
    }
}

/// Turn a non-success response into `Error::Status` with its body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));
    Err(Error::Status {
        status: status.as_u16(),
        body,
    })
}

impl AssetService for CloudClient {
    fn fetch_quota<'a>(
        &'a self,
        api_key: &'a str,
        query: &'a QuotaQuery,
    ) -> BoxFuture<'a, Result<QuotaReport>> {
        Box::pin(self.quota(api_key, query))
    }

    fn create_asset<'a>(
        &'a self,
        api_key: &'a str,
        upload: AssetUpload,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.create(api_key, upload))
    }

    fn get_operation<'a>(
        &'a self,
        api_key: &'a str,
        operation_id: &'a str,
    ) -> BoxFuture<'a, Result<OperationStatus>> {
        Box::pin(self.operation(api_key, operation_id))
    }
}
