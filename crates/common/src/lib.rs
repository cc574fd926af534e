//! Types shared by the upload gateway crates: configuration errors and the
//! redacting `Secret` wrapper used for API keys.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
