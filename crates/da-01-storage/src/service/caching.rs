//! # Cache Decorators
//!
//! Read-through/write-through caching, policy agnostic: eviction belongs to
//! the cache store itself (`LruStorageService`, or an external cache).
//!
//! - `CachingStorageService`: cache in front of a storage service.
//! - `CacheStorageToDaAdapter`: cache in front of a full DA service.
//!
//! Cache population failures are logged and never fail the operation.

use crate::domain::CacheSettings;
use async_trait::async_trait;
use shared_types::{
    verify_content, Certificate, DaError, DaReader, DaService, DaWriter, DataHash,
    ExpirationPolicy, StorageCapabilities, StorageService, TimeSource, Timestamp,
};
use std::sync::Arc;
use tracing::{trace, warn};

/// Lookup and population logic shared by both decorators.
struct CacheLayer {
    cache: Arc<dyn StorageService>,
    settings: CacheSettings,
    clock: Arc<dyn TimeSource>,
}

impl CacheLayer {
    /// `Ok(Some)` on a verified hit, `Ok(None)` on a miss.
    async fn lookup(&self, hash: &DataHash) -> Result<Option<Vec<u8>>, DaError> {
        match self.cache.get_by_hash(hash).await {
            Ok(data) => {
                verify_content(hash, &data)?;
                trace!(cache = %self.cache.name(), %hash, "[da-01] cache hit");
                Ok(Some(data))
            }
            Err(e) if e.is_integrity_failure() => Err(e),
            Err(e) => {
                if !e.is_not_found() {
                    warn!(cache = %self.cache.name(), %hash, error = %e, "[da-01] cache read failed");
                }
                Ok(None)
            }
        }
    }

    async fn populate(&self, data: &[u8], payload_expiration: Option<Timestamp>) {
        let cache_deadline = self
            .clock
            .now()
            .saturating_add(self.settings.expiration.as_secs());
        let expiration = payload_expiration.map_or(cache_deadline, |e| e.min(cache_deadline));
        if let Err(e) = self.cache.put(data, expiration).await {
            warn!(cache = %self.cache.name(), error = %e, "[da-01] cache population failed");
        }
    }
}

/// Cache in front of a storage service.
pub struct CachingStorageService {
    layer: CacheLayer,
    target: Arc<dyn StorageService>,
}

impl CachingStorageService {
    pub fn new(
        cache: Arc<dyn StorageService>,
        target: Arc<dyn StorageService>,
        settings: CacheSettings,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            layer: CacheLayer {
                cache,
                settings,
                clock,
            },
            target,
        }
    }
}

#[async_trait]
impl DaReader for CachingStorageService {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        if let Some(data) = self.layer.lookup(hash).await? {
            return Ok(data);
        }
        let data = self.target.get_by_hash(hash).await?;
        self.layer.populate(&data, None).await;
        Ok(data)
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        self.target.expiration_policy().await
    }

    async fn health_check(&self) -> Result<(), DaError> {
        self.target.health_check().await
    }

    fn name(&self) -> String {
        format!("cached({} -> {})", self.layer.cache.name(), self.target.name())
    }
}

#[async_trait]
impl StorageService for CachingStorageService {
    async fn put(&self, data: &[u8], expiration: Timestamp) -> Result<(), DaError> {
        self.target.put(data, expiration).await?;
        self.layer.populate(data, Some(expiration)).await;
        Ok(())
    }

    async fn sync(&self) -> Result<(), DaError> {
        self.target.sync().await
    }

    fn capabilities(&self) -> StorageCapabilities {
        self.target.capabilities()
    }
}

/// Cache in front of a full DA service (reader + certifying writer).
pub struct CacheStorageToDaAdapter {
    layer: CacheLayer,
    target: Arc<dyn DaService>,
}

impl CacheStorageToDaAdapter {
    pub fn new(
        cache: Arc<dyn StorageService>,
        target: Arc<dyn DaService>,
        settings: CacheSettings,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            layer: CacheLayer {
                cache,
                settings,
                clock,
            },
            target,
        }
    }
}

#[async_trait]
impl DaReader for CacheStorageToDaAdapter {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        if let Some(data) = self.layer.lookup(hash).await? {
            return Ok(data);
        }
        let data = self.target.get_by_hash(hash).await?;
        self.layer.populate(&data, None).await;
        Ok(data)
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        self.target.expiration_policy().await
    }

    async fn health_check(&self) -> Result<(), DaError> {
        self.target.health_check().await
    }

    fn name(&self) -> String {
        format!("cached({} -> {})", self.layer.cache.name(), self.target.name())
    }
}

#[async_trait]
impl DaWriter for CacheStorageToDaAdapter {
    async fn store(&self, data: &[u8], expiration: Timestamp) -> Result<Certificate, DaError> {
        let cert = self.target.store(data, expiration).await?;
        self.layer.populate(data, Some(expiration)).await;
        Ok(cert)
    }
}
