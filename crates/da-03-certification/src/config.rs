//! Certification settings.

use std::time::Duration;

/// Settings for the signing side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertifyingWriterSettings {
    /// Position of the local key in the committee.
    pub signer_index: usize,
    /// Check on-chain membership before signing.
    pub require_chain_authorization: bool,
    /// Budget for each chain read.
    pub chain_timeout: Duration,
}

impl Default for CertifyingWriterSettings {
    fn default() -> Self {
        Self {
            signer_index: 0,
            require_chain_authorization: false,
            chain_timeout: Duration::from_secs(5),
        }
    }
}

/// Settings for the validating side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSettings {
    /// Minimum signer count; the committee's own quorum applies when higher.
    pub quorum_threshold: usize,
    /// Serve `RetrieveKey::Hash` lookups without a certificate.
    pub allow_hash_reads: bool,
    /// Budget for each chain read.
    pub chain_timeout: Duration,
    /// Committees kept in memory, keyed by height.
    pub committee_cache_size: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            quorum_threshold: 1,
            allow_hash_reads: false,
            chain_timeout: Duration::from_secs(5),
            committee_cache_size: 64,
        }
    }
}
