//! Credential pool with cached per-key upload quotas
//!
//! Holds the priority-ordered API keys and the last-known quota for each one.
//! Selection walks the keys in priority order and hands out the first one that
//! still has capacity, probing the remote service only when the cached
//! snapshot for a key is missing or stale.
//!
//! Snapshot lifecycle:
//! 1. No snapshot → `QuotaProbe` asks the service, result stored in `QuotaCache`
//! 2. Fresh snapshot → used as-is, no network
//! 3. Successful upload → cached `remaining` decremented by one
//! 4. Freshness window elapses → snapshot treated as absent, re-probed
//! 5. Probe failure → "unknown" snapshot (fail-open), also expires after the window

pub mod cache;
pub mod credential;
pub mod error;
pub mod probe;
pub mod selector;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{QuotaCache, QuotaSnapshot};
pub use credential::{Credential, CredentialSet};
pub use error::{Error, Result};
pub use probe::QuotaProbe;
pub use selector::CredentialSelector;
