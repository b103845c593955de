//! # RocksDB Storage Adapter
//!
//! Embedded-database backend (`kind = "database"`), enabled with the
//! `rocksdb` feature.
//!
//! ## Column Families
//!
//! - `payloads` - hash -> payload bytes
//! - `expirations` - hash -> expiration (u64 BE)
//!
//! Both are written in one `WriteBatch` so a payload never exists without
//! its expiration. Blocking database calls run on the blocking pool.

use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, Options, WriteBatch, DB};
use shared_types::{
    verify_content, DaError, DaReader, DataHash, ExpirationPolicy, StorageCapabilities,
    StorageService, TimeSource, Timestamp,
};
use std::sync::Arc;
use tracing::info;

pub const CF_PAYLOADS: &str = "payloads";
pub const CF_EXPIRATIONS: &str = "expirations";

/// RocksDB configuration
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 32MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
    /// Hide and delete entries past their expiration
    pub discard_after_timeout: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/da-rocksdb".to_string(),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 32 * 1024 * 1024,
            sync_writes: true,
            discard_after_timeout: false,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 4 * 1024 * 1024,
            write_buffer_size: 2 * 1024 * 1024,
            sync_writes: false,
            discard_after_timeout: false,
        }
    }
}

/// RocksDB-backed storage service.
pub struct RocksDbStorageService {
    name: String,
    db: Arc<DB>,
    config: RocksDbConfig,
    clock: Arc<dyn TimeSource>,
}

impl RocksDbStorageService {
    /// Open or create the database.
    pub fn open(
        name: impl Into<String>,
        config: RocksDbConfig,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, DaError> {
        let name = name.into();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cfs = [CF_PAYLOADS, CF_EXPIRATIONS]
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(*cf, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, &config.path, cfs).map_err(|e| {
            DaError::transient(name.clone(), format!("failed to open RocksDB: {}", e))
        })?;
        info!(service = %name, path = %config.path, "[da-01] rocksdb storage opened");

        Ok(Self {
            name,
            db: Arc::new(db),
            config,
            clock,
        })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, DaError>
    where
        T: Send + 'static,
        F: FnOnce(&DB) -> Result<T, rocksdb::Error> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let name = self.name.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| DaError::transient(name.clone(), format!("blocking task failed: {}", e)))?
            .map_err(|e| DaError::transient(name, format!("RocksDB: {}", e)))
    }
}

fn decode_expiration(bytes: &[u8]) -> Option<Timestamp> {
    let arr: [u8; 8] = bytes.try_into().ok()?;
    Some(Timestamp::from_be_bytes(arr))
}

#[async_trait]
impl DaReader for RocksDbStorageService {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        let key = *hash.as_bytes();
        let found = self
            .blocking(move |db| {
                let (Some(payloads), Some(expirations)) =
                    (db.cf_handle(CF_PAYLOADS), db.cf_handle(CF_EXPIRATIONS))
                else {
                    return Ok(None);
                };
                let data = db.get_cf(&payloads, key)?;
                let exp = db.get_cf(&expirations, key)?;
                Ok(data.map(|d| (d, exp)))
            })
            .await?;

        let Some((data, exp)) = found else {
            return Err(DaError::NotFound { hash: *hash });
        };
        let expiration = exp.as_deref().and_then(decode_expiration).unwrap_or(0);
        if self.config.discard_after_timeout && expiration < self.clock.now() {
            self.blocking(move |db| {
                let mut batch = WriteBatch::default();
                if let (Some(p), Some(e)) = (db.cf_handle(CF_PAYLOADS), db.cf_handle(CF_EXPIRATIONS)) {
                    batch.delete_cf(&p, key);
                    batch.delete_cf(&e, key);
                }
                db.write(batch)
            })
            .await?;
            return Err(DaError::NotFound { hash: *hash });
        }
        verify_content(hash, &data)?;
        Ok(data)
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        Ok(if self.config.discard_after_timeout {
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
impl StorageService for RocksDbStorageService {
    async fn put(&self, data: &[u8], expiration: Timestamp) -> Result<(), DaError> {
        let key = *DataHash::of(data).as_bytes();
        let data = data.to_vec();
        let sync_writes = self.config.sync_writes;
        let name = self.name.clone();
        let missing_cf = move || DaError::transient(name, "missing column family");

        let written = self
            .blocking(move |db| {
                let (Some(payloads), Some(expirations)) =
                    (db.cf_handle(CF_PAYLOADS), db.cf_handle(CF_EXPIRATIONS))
                else {
                    return Ok(false);
                };
                let existing = db
                    .get_cf(&expirations, key)?
                    .as_deref()
                    .and_then(decode_expiration);
                let expiration = existing.map_or(expiration, |e| e.max(expiration));

                let mut batch = WriteBatch::default();
                batch.put_cf(&payloads, key, &data);
                batch.put_cf(&expirations, key, expiration.to_be_bytes());
                let mut write_opts = rocksdb::WriteOptions::default();
                write_opts.set_sync(sync_writes);
                db.write_opt(batch, &write_opts)?;
                Ok(true)
            })
            .await?;
        if written {
            Ok(())
        } else {
            Err(missing_cf())
        }
    }

    async fn sync(&self) -> Result<(), DaError> {
        self.blocking(|db| db.flush()).await
    }

    async fn stored_entries(&self) -> Result<Vec<(DataHash, Timestamp)>, DaError> {
        self.blocking(|db| {
            let Some(expirations) = db.cf_handle(CF_EXPIRATIONS) else {
                return Ok(Vec::new());
            };
            let mut entries = Vec::new();
            for item in db.iterator_cf(&expirations, rocksdb::IteratorMode::Start) {
                let (key, value) = item?;
                let (Ok(key), Some(expiration)) =
                    (<[u8; 32]>::try_from(key.as_ref()), decode_expiration(&value))
                else {
                    continue;
                };
                entries.push((DataHash(key), expiration));
            }
            Ok(entries)
        })
        .await
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities::persistent()
    }
}
