//! # Read-Limited Adapters
//!
//! Let a plain reader stand where a storage service or a full DA service is
//! expected. Every write path fails with `Unsupported`.

use async_trait::async_trait;
use shared_types::{
    Certificate, DaError, DaReader, DaWriter, DataHash, ExpirationPolicy, StorageCapabilities,
    StorageService, Timestamp,
};
use std::sync::Arc;

/// A reader presented as a `StorageService`.
pub struct ReadLimitedStorageService {
    reader: Arc<dyn DaReader>,
}

impl ReadLimitedStorageService {
    pub fn new(reader: Arc<dyn DaReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl DaReader for ReadLimitedStorageService {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        self.reader.get_by_hash(hash).await
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        self.reader.expiration_policy().await
    }

    async fn health_check(&self) -> Result<(), DaError> {
        self.reader.health_check().await
    }

    fn name(&self) -> String {
        format!("read-limited({})", self.reader.name())
    }
}

#[async_trait]
impl StorageService for ReadLimitedStorageService {
    async fn put(&self, _data: &[u8], _expiration: Timestamp) -> Result<(), DaError> {
        Err(DaError::Unsupported {
            service: self.name(),
            operation: "put",
        })
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities::lookup_only()
    }
}

/// A reader presented as a full DA service.
pub struct ReadLimitedDaService {
    reader: Arc<dyn DaReader>,
}

impl ReadLimitedDaService {
    pub fn new(reader: Arc<dyn DaReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl DaReader for ReadLimitedDaService {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        self.reader.get_by_hash(hash).await
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        self.reader.expiration_policy().await
    }

    async fn health_check(&self) -> Result<(), DaError> {
        self.reader.health_check().await
    }

    fn name(&self) -> String {
        format!("read-limited({})", self.reader.name())
    }
}

#[async_trait]
impl DaWriter for ReadLimitedDaService {
    async fn store(&self, _data: &[u8], _expiration: Timestamp) -> Result<Certificate, DaError> {
        Err(DaError::Unsupported {
            service: self.name(),
            operation: "store",
        })
    }
}
