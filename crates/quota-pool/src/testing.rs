//! In-memory quota service for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use cloud_api::{
    AssetService, AssetUpload, BoxFuture, Error, OperationStatus, QuotaEntry, QuotaQuery,
    QuotaReport,
};

/// Answers quota lookups from a table keyed by API key. Keys missing from
/// the table fail with a transport error.
#[derive(Default)]
pub struct FakeQuotaService {
    quotas: Mutex<HashMap<String, Vec<(i64, i64)>>>,
    calls: AtomicUsize,
}

impl FakeQuotaService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `capacity`/`usage` for `api_key`.
    pub fn with_quota(self, api_key: &str, capacity: i64, usage: i64) -> Self {
        self.set_quota(api_key, capacity, usage);
        self
    }

    /// Report an empty quota list for `api_key`.
    pub fn with_empty_report(self, api_key: &str) -> Self {
        self.quotas
            .lock()
            .unwrap()
            .insert(api_key.to_string(), Vec::new());
        self
    }

    pub fn set_quota(&self, api_key: &str, capacity: i64, usage: i64) {
        self.quotas
            .lock()
            .unwrap()
            .insert(api_key.to_string(), vec![(capacity, usage)]);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AssetService for FakeQuotaService {
    fn fetch_quota<'a>(
        &'a self,
        api_key: &'a str,
        _query: &'a QuotaQuery,
    ) -> BoxFuture<'a, cloud_api::Result<QuotaReport>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let entry = self.quotas.lock().unwrap().get(api_key).cloned();
        Box::pin(async move {
            match entry {
                Some(pairs) => Ok(QuotaReport {
                    quotas: pairs
                        .into_iter()
                        .map(|(capacity, usage)| QuotaEntry {
                            capacity,
                            usage,
                            period: Some("Month".into()),
                        })
                        .collect(),
                }),
                None => Err(Error::Http("connection refused".into())),
            }
        })
    }

    fn create_asset<'a>(
        &'a self,
        _api_key: &'a str,
        _upload: AssetUpload,
    ) -> BoxFuture<'a, cloud_api::Result<String>> {
        Box::pin(async { Err(Error::Http("not supported by fake".into())) })
    }

    fn get_operation<'a>(
        &'a self,
        _api_key: &'a str,
        _operation_id: &'a str,
    ) -> BoxFuture<'a, cloud_api::Result<OperationStatus>> {
        Box::pin(async { Err(Error::Http("not supported by fake".into())) })
    }
}
