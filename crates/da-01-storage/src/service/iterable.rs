//! # Iterable Storage
//!
//! Wraps any storage service and records the insertion order of every hash
//! written through it, making the store enumerable for the replication
//! daemon.
//!
//! On first use the log is seeded from the inner store's own listing, so
//! payloads persisted before a restart are enumerated too (ordered by
//! expiration, then hash). Inner stores that cannot list their contents
//! contribute nothing to the seed. Expired entries are pruned on request.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{
    DaError, DaReader, DataHash, ExpirationPolicy, IterEntry, IterableStorage,
    StorageCapabilities, StorageService, Timestamp,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

#[derive(Default)]
struct InsertionLog {
    entries: Vec<IterEntry>,
    index: HashMap<DataHash, usize>,
    next_position: u64,
}

impl InsertionLog {
    fn record(&mut self, hash: DataHash, expiration: Timestamp) {
        if let Some(&slot) = self.index.get(&hash) {
            let entry = &mut self.entries[slot];
            entry.expiration = entry.expiration.max(expiration);
            return;
        }
        self.index.insert(hash, self.entries.len());
        self.entries.push(IterEntry {
            position: self.next_position,
            hash,
            expiration,
        });
        self.next_position += 1;
    }

    fn after(&self, position: Option<u64>, limit: usize) -> Vec<IterEntry> {
        let start = match position {
            None => 0,
            Some(p) => self.entries.partition_point(|e| e.position <= p),
        };
        self.entries.iter().skip(start).take(limit).copied().collect()
    }

    /// Positions of surviving entries are kept, so cursors stay valid.
    fn prune(&mut self, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.expiration >= now);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.index = self
                .entries
                .iter()
                .enumerate()
                .map(|(slot, e)| (e.hash, slot))
                .collect();
        }
        removed
    }
}

/// Storage service with full-key enumeration in insertion order.
pub struct IterableStorageService {
    inner: Arc<dyn StorageService>,
    log: RwLock<InsertionLog>,
    seeded: OnceCell<()>,
}

impl IterableStorageService {
    pub fn new(inner: Arc<dyn StorageService>) -> Self {
        Self {
            inner,
            log: RwLock::new(InsertionLog::default()),
            seeded: OnceCell::new(),
        }
    }

    /// Record what the inner store already holds. Retried on the next call
    /// after a failure.
    async fn ensure_seeded(&self) -> Result<(), DaError> {
        self.seeded
            .get_or_try_init(|| async {
                let mut existing = match self.inner.stored_entries().await {
                    Ok(existing) => existing,
                    Err(DaError::Unsupported { .. }) => {
                        debug!(service = %self.inner.name(), "[da-01] inner store cannot list, log starts empty");
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                };
                existing.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
                let mut log = self.log.write();
                for (hash, expiration) in &existing {
                    log.record(*hash, *expiration);
                }
                info!(service = %self.inner.name(), entries = existing.len(), "[da-01] iteration log seeded");
                Ok(())
            })
            .await
            .map(|_| ())
    }

    pub fn len(&self) -> usize {
        self.log.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.read().entries.is_empty()
    }
}

#[async_trait]
impl DaReader for IterableStorageService {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        self.inner.get_by_hash(hash).await
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        self.inner.expiration_policy().await
    }

    async fn health_check(&self) -> Result<(), DaError> {
        self.inner.health_check().await
    }

    fn name(&self) -> String {
        self.inner.name()
    }
}

#[async_trait]
impl StorageService for IterableStorageService {
    async fn put(&self, data: &[u8], expiration: Timestamp) -> Result<(), DaError> {
        if let Err(e) = self.ensure_seeded().await {
            warn!(service = %self.inner.name(), error = %e, "[da-01] iteration log seed failed");
        }
        self.inner.put(data, expiration).await?;
        self.log.write().record(DataHash::of(data), expiration);
        Ok(())
    }

    async fn sync(&self) -> Result<(), DaError> {
        self.inner.sync().await
    }

    async fn stored_entries(&self) -> Result<Vec<(DataHash, Timestamp)>, DaError> {
        self.inner.stored_entries().await
    }

    fn capabilities(&self) -> StorageCapabilities {
        self.inner.capabilities().with_enumeration()
    }
}

#[async_trait]
impl IterableStorage for IterableStorageService {
    async fn entries_after(
        &self,
        position: Option<u64>,
        limit: usize,
    ) -> Result<Vec<IterEntry>, DaError> {
        self.ensure_seeded().await?;
        Ok(self.log.read().after(position, limit))
    }

    async fn prune_expired(&self, now: Timestamp) -> usize {
        let removed = self.log.write().prune(now);
        if removed > 0 {
            debug!(service = %self.inner.name(), removed, "[da-01] pruned expired log entries");
        }
        removed
    }
}
