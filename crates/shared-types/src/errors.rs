//! # Error Types
//!
//! The data-availability error taxonomy shared by every layer of the
//! decorator graph.
//!
//! ## Propagation
//!
//! | Variant | Fatal | Absorbed by redundancy/fallback |
//! |---------|-------|---------------------------------|
//! | `NotFound` | no | yes (triggers the next alternative) |
//! | `TransientIo` / `Timeout` | no | yes, while an alternative exists |
//! | `QuorumNotReached` | for the request | no |
//! | `CertificateInvalid` | yes | never |
//! | `Configuration` | at startup | never |
//! | `ContentMismatch` | yes | never |

use crate::entities::DataHash;
use thiserror::Error;

/// Errors produced by storage services, aggregators and certification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DaError {
    /// Key absent from this service.
    #[error("Not found: {hash}")]
    NotFound { hash: DataHash },

    /// Backend unreachable or failed; retryable.
    #[error("Transient I/O error in {service}: {message}")]
    TransientIo { service: String, message: String },

    /// A bounded operation ran past its deadline.
    #[error("Timed out after {millis}ms: {operation}")]
    Timeout { operation: String, millis: u64 },

    /// Not enough agreeing peers.
    #[error("Quorum not reached: {reason}")]
    QuorumNotReached { reason: String },

    /// Signature, height or authorization check failed.
    #[error("Certificate invalid: {reason}")]
    CertificateInvalid { reason: String },

    /// Contradictory or incomplete options.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Returned bytes do not hash to the requested key.
    #[error("Content mismatch: expected {expected}, got {actual}")]
    ContentMismatch { expected: DataHash, actual: DataHash },

    /// Operation not offered by this service (read-limited adapters).
    #[error("Unsupported operation on {service}: {operation}")]
    Unsupported {
        service: String,
        operation: &'static str,
    },
}

impl DaError {
    /// Build a `TransientIo` error.
    pub fn transient(service: impl Into<String>, message: impl ToString) -> Self {
        DaError::TransientIo {
            service: service.into(),
            message: message.to_string(),
        }
    }

    /// Build a `CertificateInvalid` error.
    pub fn invalid_certificate(reason: impl Into<String>) -> Self {
        DaError::CertificateInvalid {
            reason: reason.into(),
        }
    }

    /// Build a `QuorumNotReached` error.
    pub fn quorum(reason: impl Into<String>) -> Self {
        DaError::QuorumNotReached {
            reason: reason.into(),
        }
    }

    /// True for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DaError::NotFound { .. })
    }

    /// True for errors a retry or an alternative replica may fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, DaError::TransientIo { .. } | DaError::Timeout { .. })
    }

    /// Integrity errors must always reach the caller.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            DaError::ContentMismatch { .. } | DaError::CertificateInvalid { .. }
        )
    }

    /// Ranks errors for aggregation; higher is more informative.
    pub fn severity(&self) -> u8 {
        match self {
            DaError::NotFound { .. } => 0,
            DaError::Unsupported { .. } => 1,
            DaError::Timeout { .. } => 2,
            DaError::TransientIo { .. } => 3,
            DaError::QuorumNotReached { .. } => 4,
            DaError::Configuration(_) => 5,
            DaError::CertificateInvalid { .. } => 6,
            DaError::ContentMismatch { .. } => 7,
        }
    }
}

/// Check `data` against its key, producing `ContentMismatch` on failure.
pub fn verify_content(expected: &DataHash, data: &[u8]) -> Result<(), DaError> {
    let actual = DataHash::of(data);
    if actual == *expected {
        Ok(())
    } else {
        Err(DaError::ContentMismatch {
            expected: *expected,
            actual,
        })
    }
}
