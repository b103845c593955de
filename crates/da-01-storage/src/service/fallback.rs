//! # Passive Fallback
//!
//! Reads the primary store first and falls back to a secondary reader. Hits
//! from the secondary are content-checked and, unless primary write errors
//! are ignored, copied into the primary with the configured retention.

use crate::domain::FallbackSettings;
use async_trait::async_trait;
use shared_types::{
    verify_content, DaError, DaReader, DataHash, ExpirationPolicy, StorageCapabilities,
    StorageService, TimeSource, Timestamp,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Primary store with a backup reader behind it.
pub struct FallbackStorageService {
    primary: Arc<dyn StorageService>,
    backup: Arc<dyn DaReader>,
    settings: FallbackSettings,
    clock: Arc<dyn TimeSource>,
}

impl FallbackStorageService {
    pub fn new(
        primary: Arc<dyn StorageService>,
        backup: Arc<dyn DaReader>,
        settings: FallbackSettings,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            primary,
            backup,
            settings,
            clock,
        }
    }

    pub fn primary(&self) -> &Arc<dyn StorageService> {
        &self.primary
    }

    pub fn backup(&self) -> &Arc<dyn DaReader> {
        &self.backup
    }

    pub fn settings(&self) -> &FallbackSettings {
        &self.settings
    }

    /// Expiration applied to copies made into the primary store.
    pub fn retention_deadline(&self) -> Timestamp {
        self.clock
            .now()
            .saturating_add(self.settings.retention_period.as_secs())
    }
}

#[async_trait]
impl DaReader for FallbackStorageService {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        let primary_err = match self.primary.get_by_hash(hash).await {
            Ok(data) => return Ok(data),
            Err(e) if e.is_integrity_failure() => return Err(e),
            Err(e) => {
                if !e.is_not_found() {
                    warn!(primary = %self.primary.name(), %hash, error = %e, "[da-01] primary read failed, trying backup");
                }
                e
            }
        };

        let data = match self.backup.get_by_hash(hash).await {
            Ok(data) => data,
            Err(backup_err) => {
                return Err(if primary_err.severity() > backup_err.severity() {
                    primary_err
                } else {
                    backup_err
                });
            }
        };
        verify_content(hash, &data)?;
        debug!(backup = %self.backup.name(), %hash, "[da-01] served from backup");

        if self.settings.backfills() {
            let expiration = self.retention_deadline();
            if let Err(e) = self.primary.put(&data, expiration).await {
                warn!(primary = %self.primary.name(), %hash, error = %e, "[da-01] backfill failed");
            }
        }
        Ok(data)
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        self.primary.expiration_policy().await
    }

    async fn health_check(&self) -> Result<(), DaError> {
        self.primary.health_check().await
    }

    fn name(&self) -> String {
        format!("fallback({} -> {})", self.primary.name(), self.backup.name())
    }
}

#[async_trait]
impl StorageService for FallbackStorageService {
    async fn put(&self, data: &[u8], expiration: Timestamp) -> Result<(), DaError> {
        match self.primary.put(data, expiration).await {
            Ok(()) => Ok(()),
            Err(e) if self.settings.ignore_write_errors => {
                warn!(primary = %self.primary.name(), error = %e, "[da-01] ignoring primary write failure");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn sync(&self) -> Result<(), DaError> {
        self.primary.sync().await
    }

    fn capabilities(&self) -> StorageCapabilities {
        self.primary.capabilities()
    }
}
