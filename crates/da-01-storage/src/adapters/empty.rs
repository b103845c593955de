use async_trait::async_trait;
use shared_types::{
    DaError, DaReader, DataHash, ExpirationPolicy, StorageCapabilities, StorageService, Timestamp,
};

/// Storage service that holds nothing.
///
/// Accepts every write and discards it; every read misses. Used as the inner
/// target when a cache must stand alone as a storage service.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyStorageService;

impl EmptyStorageService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DaReader for EmptyStorageService {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        Err(DaError::NotFound { hash: *hash })
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        Ok(ExpirationPolicy::KeepForever)
    }

    fn name(&self) -> String {
        "empty".to_string()
    }
}

#[async_trait]
impl StorageService for EmptyStorageService {
    async fn put(&self, _data: &[u8], _expiration: Timestamp) -> Result<(), DaError> {
        Ok(())
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities::volatile()
    }
}
