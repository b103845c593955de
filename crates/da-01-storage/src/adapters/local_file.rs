//! # Local File Storage
//!
//! One file per payload under a data directory, named by the hex content
//! hash. Layout: `[expiration: u64 BE][payload]`.
//!
//! Writes go to a unique temp file that is fsynced and then renamed over the
//! final path, so readers never observe a partial payload.

use async_trait::async_trait;
use shared_types::{
    verify_content, DaError, DaReader, DataHash, ExpirationPolicy, StorageCapabilities,
    StorageService, TimeSource, Timestamp,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

const HEADER_LEN: usize = 8;

/// Directory-backed persistent storage service.
pub struct LocalFileStorageService {
    name: String,
    data_dir: PathBuf,
    discard_after_timeout: bool,
    clock: Arc<dyn TimeSource>,
    temp_counter: AtomicU64,
}

impl LocalFileStorageService {
    /// Open (creating if needed) the data directory.
    pub async fn open(
        name: impl Into<String>,
        data_dir: impl AsRef<Path>,
        discard_after_timeout: bool,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, DaError> {
        let name = name.into();
        let data_dir = data_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| DaError::transient(name.clone(), format!("create {}: {}", data_dir.display(), e)))?;
        info!(service = %name, dir = %data_dir.display(), "[da-01] local file storage opened");
        Ok(Self {
            name,
            data_dir,
            discard_after_timeout,
            clock,
            temp_counter: AtomicU64::new(0),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, hash: &DataHash) -> PathBuf {
        self.data_dir.join(hash.to_hex())
    }

    fn io_error(&self, context: &str, e: std::io::Error) -> DaError {
        DaError::transient(self.name.clone(), format!("{}: {}", context, e))
    }

    /// Read the file for `hash`, returning `(expiration, payload)`.
    async fn read_entry(&self, hash: &DataHash) -> Result<Option<(Timestamp, Vec<u8>)>, DaError> {
        let bytes = match tokio::fs::read(self.path_for(hash)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error("read", e)),
        };
        if bytes.len() < HEADER_LEN {
            return Err(DaError::transient(
                self.name.clone(),
                format!("truncated entry {}", hash),
            ));
        }
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&bytes[..HEADER_LEN]);
        Ok(Some((
            Timestamp::from_be_bytes(header),
            bytes[HEADER_LEN..].to_vec(),
        )))
    }

    /// Expiration header of a stored file, without loading the payload.
    async fn read_header(&self, path: &Path) -> Result<Option<Timestamp>, DaError> {
        let mut file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error("open", e)),
        };
        let mut header = [0u8; HEADER_LEN];
        match file.read_exact(&mut header).await {
            Ok(_) => Ok(Some(Timestamp::from_be_bytes(header))),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(self.io_error("read header", e)),
        }
    }

    async fn write_entry(
        &self,
        hash: &DataHash,
        data: &[u8],
        expiration: Timestamp,
    ) -> Result<(), DaError> {
        let final_path = self.path_for(hash);
        let temp_path = self.data_dir.join(format!(
            "{}.tmp{}",
            hash.to_hex(),
            self.temp_counter.fetch_add(1, Ordering::Relaxed)
        ));

        let mut buf = Vec::with_capacity(HEADER_LEN + data.len());
        buf.extend_from_slice(&expiration.to_be_bytes());
        buf.extend_from_slice(data);

        let result = async {
            let mut file = tokio::fs::File::create(&temp_path)
                .await
                .map_err(|e| self.io_error("create temp", e))?;
            file.write_all(&buf)
                .await
                .map_err(|e| self.io_error("write temp", e))?;
            file.sync_all()
                .await
                .map_err(|e| self.io_error("sync temp", e))?;
            tokio::fs::rename(&temp_path, &final_path)
                .await
                .map_err(|e| self.io_error("rename", e))
        }
        .await;

        if result.is_err() {
            let _ = tokio::fs::remove_file(&temp_path).await;
        }
        result
    }
}

#[async_trait]
impl DaReader for LocalFileStorageService {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        let Some((expiration, data)) = self.read_entry(hash).await? else {
            return Err(DaError::NotFound { hash: *hash });
        };
        if self.discard_after_timeout && expiration < self.clock.now() {
            debug!(service = %self.name, %hash, "[da-01] removing expired file");
            if let Err(e) = tokio::fs::remove_file(self.path_for(hash)).await {
                warn!(service = %self.name, %hash, error = %e, "[da-01] failed to remove expired file");
            }
            return Err(DaError::NotFound { hash: *hash });
        }
        verify_content(hash, &data)?;
        Ok(data)
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        Ok(if self.discard_after_timeout {
            ExpirationPolicy::DiscardAfterDataTimeout
        } else {
            ExpirationPolicy::KeepForever
        })
    }

    async fn health_check(&self) -> Result<(), DaError> {
        let meta = tokio::fs::metadata(&self.data_dir)
            .await
            .map_err(|e| self.io_error("stat data dir", e))?;
        if meta.is_dir() {
            Ok(())
        } else {
            Err(DaError::transient(
                self.name.clone(),
                format!("{} is not a directory", self.data_dir.display()),
            ))
        }
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[async_trait]
impl StorageService for LocalFileStorageService {
    async fn put(&self, data: &[u8], expiration: Timestamp) -> Result<(), DaError> {
        let hash = DataHash::of(data);
        if let Ok(Some((existing, stored))) = self.read_entry(&hash).await {
            if existing >= expiration && stored == data {
                return Ok(());
            }
            let expiration = existing.max(expiration);
            return self.write_entry(&hash, data, expiration).await;
        }
        self.write_entry(&hash, data, expiration).await
    }

    // Each put is fsynced before its rename.
    async fn sync(&self) -> Result<(), DaError> {
        Ok(())
    }

    async fn stored_entries(&self) -> Result<Vec<(DataHash, Timestamp)>, DaError> {
        let mut dir = tokio::fs::read_dir(&self.data_dir)
            .await
            .map_err(|e| self.io_error("list data dir", e))?;
        let mut entries = Vec::new();
        while let Some(file) = dir
            .next_entry()
            .await
            .map_err(|e| self.io_error("list data dir", e))?
        {
            // Temp files and foreign names are not payloads.
            let Some(hash) = file.file_name().to_str().and_then(DataHash::from_hex) else {
                continue;
            };
            match self.read_header(&file.path()).await {
                Ok(Some(expiration)) => entries.push((hash, expiration)),
                Ok(None) => {}
                Err(e) => warn!(service = %self.name, %hash, error = %e, "[da-01] unreadable entry skipped"),
            }
        }
        Ok(entries)
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities::persistent()
    }
}
