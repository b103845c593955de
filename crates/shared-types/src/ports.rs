//! # Ports
//!
//! The uniform contract every layer of the decorator graph speaks.
//!
//! Capabilities are explicit and composable: a component implements
//! `DaReader`, `StorageService`, `DaWriter`, `IterableStorage` or any
//! combination, and consumers ask for exactly the capability they need.
//!
//! ```text
//! DaReader ──▶ StorageService ──▶ IterableStorage
//!    │
//!    └──────┐
//! DaWriter ─┴─▶ DaService
//! ```

use crate::entities::{
    BatchCommitment, Certificate, CommitteeInfo, DataHash, ExpirationPolicy, StorageCapabilities,
    Timestamp,
};
use crate::errors::DaError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lookup of payloads by content address.
#[async_trait]
pub trait DaReader: Send + Sync {
    /// Fetch the payload stored under `hash`.
    ///
    /// Fails with `NotFound` when the key is absent, distinct from
    /// `TransientIo` on backend failure.
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError>;

    /// How this service treats expired payloads.
    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError>;

    /// Cheap liveness check.
    async fn health_check(&self) -> Result<(), DaError> {
        Ok(())
    }

    /// Name used in logs and errors.
    fn name(&self) -> String;
}

/// A reader that also persists payloads.
#[async_trait]
pub trait StorageService: DaReader {
    /// Store `data` until at least `expiration`.
    ///
    /// Idempotent: storing identical content again with a later expiration
    /// extends retention and never shortens it.
    async fn put(&self, data: &[u8], expiration: Timestamp) -> Result<(), DaError>;

    /// Flush pending writes to the durable medium.
    async fn sync(&self) -> Result<(), DaError> {
        Ok(())
    }

    /// Every `(hash, expiration)` currently held, for stores able to list
    /// their contents. Expired entries may be included.
    async fn stored_entries(&self) -> Result<Vec<(DataHash, Timestamp)>, DaError> {
        Err(DaError::Unsupported {
            service: self.name(),
            operation: "stored_entries",
        })
    }

    /// What this service supports.
    fn capabilities(&self) -> StorageCapabilities;
}

/// Certifying writer.
#[async_trait]
pub trait DaWriter: Send + Sync {
    /// Persist `data` and return a certificate for it.
    async fn store(&self, data: &[u8], expiration: Timestamp) -> Result<Certificate, DaError>;
}

/// Full data-availability service: reader and certifying writer.
pub trait DaService: DaReader + DaWriter {}

impl<T: DaReader + DaWriter + ?Sized> DaService for T {}

/// One entry of an enumerable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterEntry {
    /// Insertion position; strictly increasing.
    pub position: u64,
    /// Content address.
    pub hash: DataHash,
    /// Expiration recorded at insertion (latest known).
    pub expiration: Timestamp,
}

/// A store supporting full-key enumeration, required by replication sources.
#[async_trait]
pub trait IterableStorage: StorageService {
    /// Up to `limit` entries strictly after `position` (from the start when
    /// `None`), in insertion order.
    async fn entries_after(
        &self,
        position: Option<u64>,
        limit: usize,
    ) -> Result<Vec<IterEntry>, DaError>;

    /// Forget entries that expired before `now`. Returns how many were dropped.
    async fn prune_expired(&self, _now: Timestamp) -> usize {
        0
    }
}

/// Read access to on-chain DA state.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// The committee valid at `height`.
    async fn committee_at(&self, height: u64) -> Result<CommitteeInfo, DaError>;

    /// Height of the latest confirmed batch.
    async fn latest_confirmed_batch_height(&self) -> Result<u64, DaError>;

    /// Batch commitments confirmed in `from..=to`.
    async fn batch_commitments(&self, from: u64, to: u64)
        -> Result<Vec<BatchCommitment>, DaError>;
}

/// Abstract clock (for testability).
pub trait TimeSource: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

// =============================================================================
// TEST IMPLEMENTATIONS
// Production chain readers and clocks live with the host application.
// =============================================================================

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// In-memory chain for unit tests.
///
/// Committees are registered at activation heights; `committee_at(h)`
/// returns the committee with the greatest activation height `<= h`.
#[derive(Default)]
pub struct InMemoryChain {
    committees: RwLock<BTreeMap<u64, CommitteeInfo>>,
    batches: RwLock<BTreeMap<u64, Vec<BatchCommitment>>>,
    latest_height: AtomicU64,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate `committee` from `committee.height` onwards.
    pub fn set_committee(&self, committee: CommitteeInfo) {
        self.committees.write().insert(committee.height, committee);
    }

    /// Record a batch and advance the confirmed height if needed.
    pub fn push_batch(&self, batch: BatchCommitment) {
        self.latest_height.fetch_max(batch.height, Ordering::SeqCst);
        self.batches
            .write()
            .entry(batch.height)
            .or_default()
            .push(batch);
    }

    pub fn set_latest_height(&self, height: u64) {
        self.latest_height.store(height, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainReader for InMemoryChain {
    async fn committee_at(&self, height: u64) -> Result<CommitteeInfo, DaError> {
        self.committees
            .read()
            .range(..=height)
            .next_back()
            .map(|(_, c)| c.clone())
            .ok_or_else(|| {
                DaError::invalid_certificate(format!("no committee at height {}", height))
            })
    }

    async fn latest_confirmed_batch_height(&self) -> Result<u64, DaError> {
        Ok(self.latest_height.load(Ordering::SeqCst))
    }

    async fn batch_commitments(
        &self,
        from: u64,
        to: u64,
    ) -> Result<Vec<BatchCommitment>, DaError> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .batches
            .read()
            .range(from..=to)
            .flat_map(|(_, b)| b.iter().cloned())
            .collect())
    }
}
