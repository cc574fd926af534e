//! Error types for pool construction

/// Errors from building a credential pool.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("credential pool is empty")]
    Empty,

    #[error("duplicate credential name: {0}")]
    DuplicateName(String),
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
