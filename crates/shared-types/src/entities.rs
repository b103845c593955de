//! # Core Domain Entities
//!
//! Defines the data-availability entities shared by every crate.
//!
//! ## Clusters
//!
//! - **Content**: `DataHash`, `Timestamp`, `ExpirationPolicy`
//! - **Certification**: `Certificate`, `CommitteeInfo`, `BatchCommitment`
//! - **Composition**: `StorageCapabilities`, `RetrieveKey`

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha3::{Digest, Keccak256};
use std::fmt;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// Compressed BLS public key (G1, `min_pk` variant).
pub type BlsPublicKeyBytes = [u8; 48];

/// Compressed BLS signature (G2, `min_pk` variant).
pub type BlsSignatureBytes = [u8; 96];

/// Maximum committee size addressable by a `u64` signer mask.
pub const MAX_COMMITTEE_SIZE: usize = 64;

// =============================================================================
// CLUSTER A: CONTENT
// =============================================================================

/// Keccak-256 content address of a payload.
///
/// Identical content always maps to the same key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct DataHash(pub [u8; 32]);

impl DataHash {
    /// Hash a payload.
    pub fn of(data: &[u8]) -> Self {
        let digest = Keccak256::digest(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Check that `data` hashes to this key.
    pub fn matches(&self, data: &[u8]) -> bool {
        Self::of(data) == *self
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Display for DataHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for DataHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataHash(0x{}..)", &self.to_hex()[..8])
    }
}

/// How a storage service treats payloads past their expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpirationPolicy {
    /// Never discards.
    KeepForever,
    /// Discards once the requested expiration has passed.
    DiscardAfterDataTimeout,
    /// Discards once an archive retention window has passed.
    DiscardAfterArchiveTimeout,
}

// =============================================================================
// CLUSTER B: CERTIFICATION
// =============================================================================

/// Proof that a quorum of committee members attested that `data_hash` is
/// retrievable until `expiration`.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Content address of the payload.
    pub data_hash: DataHash,
    /// Retention promised by the signers.
    pub expiration: Timestamp,
    /// Chain height whose committee signed this certificate.
    pub committee_height: u64,
    /// Bit `i` set when committee member `i` signed.
    pub signers_mask: u64,
    /// Aggregate BLS signature over `signable_message()`.
    #[serde_as(as = "Bytes")]
    pub signature: BlsSignatureBytes,
}

impl Certificate {
    /// Message signed by every committee member: `data_hash || expiration_be`.
    pub fn signable_message(data_hash: &DataHash, expiration: Timestamp) -> Vec<u8> {
        let mut msg = Vec::with_capacity(40);
        msg.extend_from_slice(data_hash.as_bytes());
        msg.extend_from_slice(&expiration.to_be_bytes());
        msg
    }

    /// The message this certificate's signature covers.
    pub fn message(&self) -> Vec<u8> {
        Self::signable_message(&self.data_hash, self.expiration)
    }

    /// Committee indices of the signers, ascending.
    pub fn signer_indices(&self) -> Vec<usize> {
        (0..MAX_COMMITTEE_SIZE)
            .filter(|i| self.signers_mask & (1u64 << i) != 0)
            .collect()
    }

    /// Number of signers in the mask.
    pub fn signer_count(&self) -> usize {
        self.signers_mask.count_ones() as usize
    }

    /// Compact binary encoding.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decode from `encode()` output.
    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("data_hash", &self.data_hash)
            .field("expiration", &self.expiration)
            .field("committee_height", &self.committee_height)
            .field("signers_mask", &format_args!("{:#x}", self.signers_mask))
            .finish()
    }
}

/// The signer set valid at a chain height.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeInfo {
    /// Height this committee was read at.
    pub height: u64,
    /// Members; index `i` corresponds to mask bit `i`.
    #[serde_as(as = "Vec<Bytes>")]
    pub members: Vec<BlsPublicKeyBytes>,
    /// Minimum signers required for a valid certificate.
    pub quorum: usize,
}

impl CommitteeInfo {
    /// Mask with one bit per member.
    pub fn full_mask(&self) -> u64 {
        match self.members.len() {
            0 => 0,
            n if n >= MAX_COMMITTEE_SIZE => u64::MAX,
            n => (1u64 << n) - 1,
        }
    }

    /// True when every bit of `mask` addresses a member.
    pub fn contains_mask(&self, mask: u64) -> bool {
        mask & !self.full_mask() == 0
    }

    /// Index of `key` in the committee, if it is a member.
    pub fn index_of(&self, key: &BlsPublicKeyBytes) -> Option<usize> {
        self.members.iter().position(|m| m == key)
    }
}

/// An on-chain batch posted with a DA certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCommitment {
    /// Chain height the batch was confirmed at.
    pub height: u64,
    /// Chain timestamp of the confirmation.
    pub timestamp: Timestamp,
    /// Certificate carried by the batch.
    pub certificate: Certificate,
}

// =============================================================================
// CLUSTER C: COMPOSITION
// =============================================================================

/// What a storage service supports. Decides which decorators may wrap it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageCapabilities {
    /// Survives process restarts.
    pub persistent: bool,
    /// Supports full-key enumeration (replication source).
    pub enumerable: bool,
    /// Only supports single-key lookups (remote readers).
    pub single_key_only: bool,
}

impl StorageCapabilities {
    /// Memory-only, lookup-and-write store.
    pub const fn volatile() -> Self {
        Self {
            persistent: false,
            enumerable: false,
            single_key_only: false,
        }
    }

    /// Durable store.
    pub const fn persistent() -> Self {
        Self {
            persistent: true,
            enumerable: false,
            single_key_only: false,
        }
    }

    /// Remote lookup-only reader.
    pub const fn lookup_only() -> Self {
        Self {
            persistent: false,
            enumerable: false,
            single_key_only: true,
        }
    }

    /// Same record with enumeration added.
    pub const fn with_enumeration(mut self) -> Self {
        self.enumerable = true;
        self
    }
}

/// Handle a reader uses to fetch a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrieveKey {
    /// Validated retrieval.
    Certificate(Certificate),
    /// Raw content-address lookup.
    Hash(DataHash),
}

impl RetrieveKey {
    /// The content address being requested.
    pub fn data_hash(&self) -> DataHash {
        match self {
            Self::Certificate(cert) => cert.data_hash,
            Self::Hash(hash) => *hash,
        }
    }
}

impl From<Certificate> for RetrieveKey {
    fn from(cert: Certificate) -> Self {
        Self::Certificate(cert)
    }
}

impl From<DataHash> for RetrieveKey {
    fn from(hash: DataHash) -> Self {
        Self::Hash(hash)
    }
}
