//! Test doubles shared by unit tests here and by downstream crates.

use crate::adapters::InMemoryStorageService;
use async_trait::async_trait;
use shared_types::{
    DaError, DaReader, DataHash, ExpirationPolicy, StorageCapabilities, StorageService, Timestamp,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory store with switchable failures, corruption and call counters.
pub struct ScriptedStorage {
    inner: InMemoryStorageService,
    fail_puts: AtomicBool,
    fail_gets: AtomicBool,
    corrupt_reads: AtomicBool,
    get_delay_ms: AtomicUsize,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl ScriptedStorage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: InMemoryStorageService::new(name),
            fail_puts: AtomicBool::new(false),
            fail_gets: AtomicBool::new(false),
            corrupt_reads: AtomicBool::new(false),
            get_delay_ms: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Serve altered bytes for every hit.
    pub fn corrupt_reads(&self, corrupt: bool) {
        self.corrupt_reads.store(corrupt, Ordering::SeqCst);
    }

    /// Delay every read by `delay`.
    pub fn delay_gets(&self, delay: Duration) {
        self.get_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.gets.store(0, Ordering::SeqCst);
        self.puts.store(0, Ordering::SeqCst);
    }

    pub fn contains(&self, hash: &DataHash) -> bool {
        self.inner.contains(hash)
    }

    pub fn expiration_of(&self, hash: &DataHash) -> Option<Timestamp> {
        self.inner.expiration_of(hash)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl DaReader for ScriptedStorage {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let delay = self.get_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(DaError::transient(self.inner.name(), "scripted read failure"));
        }
        let mut data = self.inner.get_by_hash(hash).await?;
        if self.corrupt_reads.load(Ordering::SeqCst) {
            data.push(0xFF);
        }
        Ok(data)
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        self.inner.expiration_policy().await
    }

    async fn health_check(&self) -> Result<(), DaError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(DaError::transient(self.inner.name(), "unhealthy"));
        }
        Ok(())
    }

    fn name(&self) -> String {
        self.inner.name()
    }
}

#[async_trait]
impl StorageService for ScriptedStorage {
    async fn put(&self, data: &[u8], expiration: Timestamp) -> Result<(), DaError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(DaError::transient(self.inner.name(), "scripted write failure"));
        }
        self.inner.put(data, expiration).await
    }

    async fn stored_entries(&self) -> Result<Vec<(DataHash, Timestamp)>, DaError> {
        self.inner.stored_entries().await
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities::persistent()
    }
}
