use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use shared_types::{
    DaError, DaReader, DataHash, ExpirationPolicy, StorageCapabilities, StorageService,
    TimeSource, Timestamp,
};
use std::num::NonZeroUsize;
use std::sync::Arc;

struct CachedPayload {
    data: Vec<u8>,
    expiration: Timestamp,
}

/// Bounded in-process cache with per-entry expiration.
///
/// Least-recently-used entries are evicted once `capacity` is reached.
pub struct LruStorageService {
    entries: Mutex<LruCache<DataHash, CachedPayload>>,
    clock: Arc<dyn TimeSource>,
}

impl LruStorageService {
    pub fn new(capacity: usize, clock: Arc<dyn TimeSource>) -> Result<Self, DaError> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| DaError::Configuration("cache capacity must be non-zero".into()))?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            clock,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl DaReader for LruStorageService {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(hash) {
            Some(p) if p.expiration >= now => Ok(p.data.clone()),
            Some(_) => {
                entries.pop(hash);
                Err(DaError::NotFound { hash: *hash })
            }
            None => Err(DaError::NotFound { hash: *hash }),
        }
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        Ok(ExpirationPolicy::DiscardAfterDataTimeout)
    }

    fn name(&self) -> String {
        "lru-cache".to_string()
    }
}

#[async_trait]
impl StorageService for LruStorageService {
    async fn put(&self, data: &[u8], expiration: Timestamp) -> Result<(), DaError> {
        let hash = DataHash::of(data);
        let mut entries = self.entries.lock();
        match entries.get_mut(&hash) {
            Some(p) => p.expiration = p.expiration.max(expiration),
            None => {
                entries.put(
                    hash,
                    CachedPayload {
                        data: data.to_vec(),
                        expiration,
                    },
                );
            }
        }
        Ok(())
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities::volatile()
    }
}
