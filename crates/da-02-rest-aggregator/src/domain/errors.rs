//! Remote call errors and their mapping into the DA taxonomy.

use shared_types::{DaError, DataHash};
use thiserror::Error;

/// Errors that can occur when talking to a remote committee member.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {0}")]
    Status(u16),
    #[error("Not found")]
    NotFound,
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Connection failed: {0}")]
    Connection(String),
}

impl ApiError {
    /// Map into `DaError`, naming the endpoint for transient failures.
    pub fn into_da_error(self, endpoint: &str, hash: Option<DataHash>) -> DaError {
        match (self, hash) {
            (ApiError::NotFound, Some(hash)) => DaError::NotFound { hash },
            (ApiError::Http(e), _) if e.is_timeout() => DaError::Timeout {
                operation: format!("request to {}", endpoint),
                millis: 0,
            },
            (e, _) => DaError::transient(endpoint, e),
        }
    }
}
