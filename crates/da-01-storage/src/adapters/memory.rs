use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{
    DaError, DaReader, DataHash, ExpirationPolicy, StorageCapabilities, StorageService,
    SystemTimeSource, TimeSource, Timestamp,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

struct StoredPayload {
    data: Vec<u8>,
    expiration: Timestamp,
}

/// In-memory storage service for tests and ephemeral nodes.
pub struct InMemoryStorageService {
    name: String,
    entries: RwLock<HashMap<DataHash, StoredPayload>>,
    discard_after_timeout: bool,
    clock: Arc<dyn TimeSource>,
}

impl InMemoryStorageService {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_clock(name, false, Arc::new(SystemTimeSource))
    }

    pub fn with_clock(
        name: impl Into<String>,
        discard_after_timeout: bool,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
            discard_after_timeout,
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, hash: &DataHash) -> bool {
        self.entries.read().contains_key(hash)
    }

    /// Recorded expiration of `hash`, if stored.
    pub fn expiration_of(&self, hash: &DataHash) -> Option<Timestamp> {
        self.entries.read().get(hash).map(|p| p.expiration)
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, p| p.expiration >= now);
        before - entries.len()
    }
}

#[async_trait]
impl DaReader for InMemoryStorageService {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        let now = self.clock.now();
        {
            let entries = self.entries.read();
            match entries.get(hash) {
                Some(p) if !self.discard_after_timeout || p.expiration >= now => {
                    return Ok(p.data.clone());
                }
                Some(_) => {}
                None => return Err(DaError::NotFound { hash: *hash }),
            }
        }
        trace!(service = %self.name, %hash, "[da-01] discarding expired entry");
        self.entries.write().remove(hash);
        Err(DaError::NotFound { hash: *hash })
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        Ok(if self.discard_after_timeout {
            ExpirationPolicy::DiscardAfterDataTimeout
        } else {
            ExpirationPolicy::KeepForever
        })
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[async_trait]
impl StorageService for InMemoryStorageService {
    async fn put(&self, data: &[u8], expiration: Timestamp) -> Result<(), DaError> {
        let hash = DataHash::of(data);
        let mut entries = self.entries.write();
        entries
            .entry(hash)
            .and_modify(|p| p.expiration = p.expiration.max(expiration))
            .or_insert_with(|| StoredPayload {
                data: data.to_vec(),
                expiration,
            });
        Ok(())
    }

    async fn stored_entries(&self) -> Result<Vec<(DataHash, Timestamp)>, DaError> {
        Ok(self
            .entries
            .read()
            .iter()
            .map(|(hash, p)| (*hash, p.expiration))
            .collect())
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities::volatile()
    }
}
