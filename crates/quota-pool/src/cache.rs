//! Last-known quota per credential
//!
//! Snapshots carry their own expiry (`valid_until`). Staleness is checked on
//! read: an expired snapshot behaves exactly like a missing one, and nothing
//! evicts entries in the background. A tokio `Mutex` guards the map so the
//! check-and-decrement after a successful upload is a single critical section
//! even when several batches run at once.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::credential::Credential;

/// Quota state of one credential as of the last probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    /// Units left in the current period, or `UNKNOWN`.
    pub remaining: i64,
    /// Units per period, or `UNKNOWN`.
    pub capacity: i64,
    pub valid_until: Instant,
}

impl QuotaSnapshot {
    pub const UNKNOWN: i64 = -1;

    /// Snapshot computed from a remote capacity/usage pair. Usage above
    /// capacity clamps to zero remaining so that `UNKNOWN` stays unambiguous.
    pub fn known(capacity: i64, usage: i64, valid_until: Instant) -> Self {
        Self {
            remaining: capacity.saturating_sub(usage).max(0),
            capacity,
            valid_until,
        }
    }

    /// Snapshot for a key whose quota could not be read.
    pub fn unknown(valid_until: Instant) -> Self {
        Self {
            remaining: Self::UNKNOWN,
            capacity: Self::UNKNOWN,
            valid_until,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.remaining == Self::UNKNOWN
    }

    /// Whether the key may be used: capacity left, or unknown (fail-open).
    pub fn has_capacity(&self) -> bool {
        self.remaining != 0
    }

    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now < self.valid_until
    }
}

/// In-memory quota cache keyed by credential name.
#[derive(Debug, Default)]
pub struct QuotaCache {
    entries: Mutex<HashMap<String, QuotaSnapshot>>,
}

impl QuotaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh snapshot for `credential`, or `None` when missing or expired.
    pub async fn get(&self, credential: &Credential) -> Option<QuotaSnapshot> {
        let entries = self.entries.lock().await;
        entries
            .get(credential.name())
            .copied()
            .filter(|snapshot| snapshot.is_fresh_at(Instant::now()))
    }

    /// Store `snapshot`, replacing whatever was cached.
    pub async fn put(&self, credential: &Credential, snapshot: QuotaSnapshot) {
        debug!(
            credential = credential.name(),
            remaining = snapshot.remaining,
            capacity = snapshot.capacity,
            "quota snapshot stored"
        );
        self.entries
            .lock()
            .await
            .insert(credential.name().to_string(), snapshot);
    }

    /// Consume one unit after a successful upload.
    ///
    /// No-op when nothing is cached or `remaining` is already zero or unknown.
    /// `valid_until` is left untouched.
    pub async fn decrement(&self, credential: &Credential) {
        let mut entries = self.entries.lock().await;
        if let Some(snapshot) = entries.get_mut(credential.name()) {
            if snapshot.remaining > 0 {
                snapshot.remaining -= 1;
                debug!(
                    credential = credential.name(),
                    remaining = snapshot.remaining,
                    "quota decremented"
                );
            }
        }
    }

    /// Drop the snapshot so the next selection re-probes.
    pub async fn invalidate(&self, credential: &Credential) {
        if self.entries.lock().await.remove(credential.name()).is_some() {
            debug!(credential = credential.name(), "quota snapshot invalidated");
        }
    }

    /// Quota summary for the health endpoint.
    ///
    /// Per credential: cached remaining/capacity and whether the snapshot is
    /// still fresh. Status: every key usable → healthy, some → degraded,
    /// none → unhealthy. Keys without a fresh snapshot count as usable since
    /// the next selection will probe them.
    pub async fn health(&self, credentials: &[Credential]) -> serde_json::Value {
        let entries = self.entries.lock().await;
        let now = Instant::now();

        let mut accounts = Vec::with_capacity(credentials.len());
        let mut usable = 0usize;
        let mut exhausted = 0usize;

        for credential in credentials {
            match entries.get(credential.name()) {
                Some(snapshot) if snapshot.is_fresh_at(now) => {
                    if snapshot.has_capacity() {
                        usable += 1;
                    } else {
                        exhausted += 1;
                    }
                    accounts.push(serde_json::json!({
                        "name": credential.name(),
                        "priority": credential.priority(),
                        "remaining": snapshot.remaining,
                        "capacity": snapshot.capacity,
                        "fresh_for_secs": snapshot.valid_until.saturating_duration_since(now).as_secs(),
                    }));
                }
                _ => {
                    usable += 1;
                    accounts.push(serde_json::json!({
                        "name": credential.name(),
                        "priority": credential.priority(),
                        "remaining": serde_json::Value::Null,
                        "capacity": serde_json::Value::Null,
                    }));
                }
            }
        }

        let total = credentials.len();
        let status = if total > 0 && usable == total {
            "healthy"
        } else if usable > 0 {
            "degraded"
        } else {
            "unhealthy"
        };

        serde_json::json!({
            "status": status,
            "credentials_total": total,
            "credentials_usable": usable,
            "credentials_exhausted": exhausted,
            "credentials": accounts,
        })
    }
}
