//! Scripted asset service for pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use cloud_api::{
    AssetService, AssetUpload, BoxFuture, Error, ModerationResult, OperationResponse,
    OperationStatus, QuotaEntry, QuotaQuery, QuotaReport,
};

/// Fake service driven by queued answers.
///
/// - Quota lookups answer from a table keyed by API key; unknown keys fail
///   with a transport error (so the probe falls back to "unknown").
/// - Submissions pop `submit_script`; once empty they succeed with `op-N`.
/// - Operation polls pop `poll_script`; once empty they report done/Approved.
#[derive(Default)]
pub struct ScriptedService {
    quotas: Mutex<HashMap<String, (i64, i64)>>,
    submit_script: Mutex<VecDeque<cloud_api::Result<String>>>,
    poll_script: Mutex<VecDeque<cloud_api::Result<OperationStatus>>>,
    submissions: Mutex<Vec<(String, AssetUpload)>>,
    quota_calls: AtomicUsize,
    polls: AtomicUsize,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(self, api_key: &str, capacity: i64, usage: i64) -> Self {
        self.quotas
            .lock()
            .unwrap()
            .insert(api_key.to_string(), (capacity, usage));
        self
    }

    pub fn with_submit_results(self, results: Vec<cloud_api::Result<String>>) -> Self {
        self.submit_script.lock().unwrap().extend(results);
        self
    }

    pub fn with_poll_results(self, results: Vec<cloud_api::Result<OperationStatus>>) -> Self {
        self.poll_script.lock().unwrap().extend(results);
        self
    }

    /// API keys used for each submission, in order.
    pub fn submitted_keys(&self) -> Vec<String> {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn last_upload(&self) -> Option<AssetUpload> {
        self.submissions
            .lock()
            .unwrap()
            .last()
            .map(|(_, upload)| upload.clone())
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn quota_calls(&self) -> usize {
        self.quota_calls.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

pub fn pending() -> cloud_api::Result<OperationStatus> {
    Ok(OperationStatus {
        path: None,
        done: false,
        response: None,
    })
}

pub fn done(asset_id: &str, moderation_state: Option<&str>) -> cloud_api::Result<OperationStatus> {
    Ok(OperationStatus {
        path: None,
        done: true,
        response: Some(OperationResponse {
            asset_id: Some(asset_id.to_string()),
            moderation_result: moderation_state.map(|state| ModerationResult {
                moderation_state: Some(state.to_string()),
            }),
        }),
    })
}

pub fn server_error() -> Error {
    Error::Status {
        status: 503,
        body: "service unavailable".into(),
    }
}

impl AssetService for ScriptedService {
    fn fetch_quota<'a>(
        &'a self,
        api_key: &'a str,
        _query: &'a QuotaQuery,
    ) -> BoxFuture<'a, cloud_api::Result<QuotaReport>> {
        self.quota_calls.fetch_add(1, Ordering::SeqCst);
        let entry = self.quotas.lock().unwrap().get(api_key).copied();
        Box::pin(async move {
            match entry {
                Some((capacity, usage)) => Ok(QuotaReport {
                    quotas: vec![QuotaEntry {
                        capacity,
                        usage,
                        period: None,
                    }],
                }),
                None => Err(Error::Http("quota endpoint unreachable".into())),
            }
        })
    }

    fn create_asset<'a>(
        &'a self,
        api_key: &'a str,
        upload: AssetUpload,
    ) -> BoxFuture<'a, cloud_api::Result<String>> {
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push((api_key.to_string(), upload));
        let n = submissions.len();
        drop(submissions);
        let next = self.submit_script.lock().unwrap().pop_front();
        Box::pin(async move { next.unwrap_or_else(|| Ok(format!("op-{n}"))) })
    }

    fn get_operation<'a>(
        &'a self,
        _api_key: &'a str,
        _operation_id: &'a str,
    ) -> BoxFuture<'a, cloud_api::Result<OperationStatus>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.poll_script.lock().unwrap().pop_front();
        Box::pin(async move { next.unwrap_or_else(|| done("1000", Some("Approved"))) })
    }
}
