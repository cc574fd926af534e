//! API keys and their fallback order

use std::cmp::Ordering;
use std::collections::HashSet;

use common::Secret;

use crate::error::{Error, Result};

/// One API key granting quota-limited access to the asset service.
///
/// Immutable once loaded. Lower `priority` is tried first; ties are broken by
/// name so the fallback order is always strict.
#[derive(Debug, Clone)]
pub struct Credential {
    name: String,
    api_key: Secret<String>,
    priority: u32,
}

impl Credential {
    pub fn new(name: impl Into<String>, api_key: Secret<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            api_key,
            priority,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn api_key(&self) -> &Secret<String> {
        &self.api_key
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.name == other.name
    }
}

impl Eq for Credential {}

impl PartialOrd for Credential {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Credential {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// Credentials sorted into fallback order. Names are unique.
#[derive(Debug, Clone)]
pub struct CredentialSet {
    credentials: Vec<Credential>,
}

impl CredentialSet {
    pub fn new(mut credentials: Vec<Credential>) -> Result<Self> {
        if credentials.is_empty() {
            return Err(Error::Empty);
        }

        let mut seen = HashSet::new();
        for credential in &credentials {
            if !seen.insert(credential.name.as_str()) {
                return Err(Error::DuplicateName(credential.name.clone()));
            }
        }

        credentials.sort();
        Ok(Self { credentials })
    }

    pub fn as_slice(&self) -> &[Credential] {
        &self.credentials
    }

    pub fn names(&self) -> Vec<&str> {
        self.credentials.iter().map(Credential::name).collect()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}
