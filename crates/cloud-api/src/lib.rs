//! Client abstraction for the remote asset service
//!
//! Defines the `AssetService` trait that decouples the upload pipeline from
//! the transport. `CloudClient` is the reqwest-backed implementation talking to
//! the Open Cloud assets API; tests substitute in-memory fakes.
//!
//! The three remote interactions:
//! 1. `fetch_quota` reads a key's capacity/usage for an asset type
//! 2. `create_asset` submits a multipart upload and returns the operation id
//! 3. `get_operation` reads the status of a long-running operation

pub mod classify;
pub mod client;
pub mod error;
pub mod types;

pub use classify::classify_status;
pub use client::CloudClient;
pub use error::{Error, Result};
pub use types::{
    AssetType, AssetUpload, CreateAssetRequest, CreationContext, Creator, ModerationResult,
    OperationResponse, OperationStatus, QuotaEntry, QuotaQuery, QuotaReport,
};

use std::future::Future;
use std::pin::Pin;

/// Classification of remote errors to decide what happens to a credential.
///
/// - QuotaExceeded drops the cached quota snapshot so the next selection re-probes
/// - Permanent means retrying the same request will not help (bad key, bad payload)
/// - Transient covers timeouts and 5xx
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClassification {
    Transient,
    QuotaExceeded,
    Permanent,
}

/// Boxed future returned by `AssetService` methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Abstraction over the remote asset service.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn AssetService>`). Every call is authenticated with the raw API key
/// of the credential chosen by the caller.
pub trait AssetService: Send + Sync {
    /// Read the quota list for `query` under `api_key`.
    fn fetch_quota<'a>(
        &'a self,
        api_key: &'a str,
        query: &'a QuotaQuery,
    ) -> BoxFuture<'a, Result<QuotaReport>>;

    /// Submit an asset. Resolves to the operation id on success.
    fn create_asset<'a>(
        &'a self,
        api_key: &'a str,
        upload: AssetUpload,
    ) -> BoxFuture<'a, Result<String>>;

    /// Read the current status of an operation.
    fn get_operation<'a>(
        &'a self,
        api_key: &'a str,
        operation_id: &'a str,
    ) -> BoxFuture<'a, Result<OperationStatus>>;
}
