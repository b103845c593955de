//! # Eager (Syncing) Fallback
//!
//! A passive fallback whose primary store is also filled ahead of reads: a
//! background task follows confirmed batch commitments on chain and copies
//! every payload still inside the retention window from the backup reader
//! into the primary store.
//!
//! ```text
//! poll ──▶ latest_confirmed_batch_height
//!      ──▶ batch_commitments(cursor..=latest) + retry list
//!      ──▶ for each: expired? outside window? present? ──▶ backup.get ──▶ primary.put
//! ```

use crate::daemon::PeriodicTask;
use crate::domain::sync_state::EagerSyncState;
use crate::domain::{EagerSyncReport, EagerSyncSettings};
use crate::service::FallbackStorageService;
use async_trait::async_trait;
use shared_types::{
    verify_content, BatchCommitment, ChainReader, DaError, DaReader, DataHash, ExpirationPolicy,
    Lifecycle, StorageCapabilities, StorageService, TimeSource, Timestamp,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct EagerSyncer {
    primary: Arc<dyn StorageService>,
    backup: Arc<dyn DaReader>,
    chain: Arc<dyn ChainReader>,
    retention_secs: u64,
    clock: Arc<dyn TimeSource>,
    state: Mutex<EagerSyncState>,
}

enum Outcome {
    Synced,
    Present,
    Skipped,
    Retry,
}

impl EagerSyncer {
    async fn sync_once(&self) -> Result<EagerSyncReport, DaError> {
        let mut state = self.state.lock().await;
        let latest = self.chain.latest_confirmed_batch_height().await?;

        let mut pending = state.take_retries();
        if latest >= state.next_height {
            match self.chain.batch_commitments(state.next_height, latest).await {
                Ok(batches) => {
                    pending.extend(batches);
                    state.next_height = latest.saturating_add(1);
                }
                Err(e) => {
                    for batch in pending {
                        state.queue_retry(batch);
                    }
                    return Err(e);
                }
            }
        }

        let now = self.clock.now();
        let mut report = EagerSyncReport::default();
        for batch in pending {
            report.examined += 1;
            match self.sync_batch(&batch, now).await {
                Outcome::Synced => report.synced += 1,
                Outcome::Present => report.present += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Retry => {
                    report.retried += 1;
                    state.queue_retry(batch);
                }
            }
        }
        Ok(report)
    }

    async fn sync_batch(&self, batch: &BatchCommitment, now: Timestamp) -> Outcome {
        let cert = &batch.certificate;
        let hash = cert.data_hash;
        if cert.expiration < now || batch.timestamp.saturating_add(self.retention_secs) < now {
            return Outcome::Skipped;
        }

        match self.primary.get_by_hash(&hash).await {
            Ok(_) => return Outcome::Present,
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                warn!(%hash, error = %e, "[da-01] eager sync: primary lookup failed");
                return Outcome::Retry;
            }
        }

        let data = match self.backup.get_by_hash(&hash).await {
            Ok(data) => data,
            Err(e) => {
                warn!(%hash, height = batch.height, error = %e, "[da-01] eager sync: backup fetch failed");
                return Outcome::Retry;
            }
        };
        if let Err(e) = verify_content(&hash, &data) {
            warn!(%hash, error = %e, "[da-01] eager sync: backup returned wrong content");
            return Outcome::Retry;
        }

        let expiration = cert
            .expiration
            .min(now.saturating_add(self.retention_secs));
        match self.primary.put(&data, expiration).await {
            Ok(()) => {
                debug!(%hash, height = batch.height, "[da-01] eager sync: stored");
                Outcome::Synced
            }
            Err(e) => {
                warn!(%hash, error = %e, "[da-01] eager sync: primary write failed");
                Outcome::Retry
            }
        }
    }
}

/// Passive fallback plus a chain-driven background copier.
pub struct SyncingFallbackStorageService {
    passive: FallbackStorageService,
    syncer: Arc<EagerSyncer>,
    task: PeriodicTask,
}

impl SyncingFallbackStorageService {
    /// Fails with `Configuration` when no chain reader is available.
    pub fn new(
        passive: FallbackStorageService,
        chain: Option<Arc<dyn ChainReader>>,
        settings: EagerSyncSettings,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, DaError> {
        let chain = chain.ok_or_else(|| {
            DaError::Configuration("eager fallback requires a chain reader".into())
        })?;
        let syncer = Arc::new(EagerSyncer {
            primary: Arc::clone(passive.primary()),
            backup: Arc::clone(passive.backup()),
            chain,
            retention_secs: passive.settings().retention_period.as_secs(),
            clock,
            state: Mutex::new(EagerSyncState::new(settings.start_height)),
        });
        Ok(Self {
            passive,
            syncer,
            task: PeriodicTask::new("eager-fallback-sync", settings.poll_interval),
        })
    }

    /// Run one poll of the chain. Exposed for tests and manual triggering.
    pub async fn sync_once(&self) -> Result<EagerSyncReport, DaError> {
        self.syncer.sync_once().await
    }

    /// Next batch height the syncer will request.
    pub async fn next_height(&self) -> u64 {
        self.syncer.state.lock().await.next_height
    }

    pub async fn pending_retries(&self) -> usize {
        self.syncer.state.lock().await.pending_retries()
    }
}

#[async_trait]
impl DaReader for SyncingFallbackStorageService {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        self.passive.get_by_hash(hash).await
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        self.passive.expiration_policy().await
    }

    async fn health_check(&self) -> Result<(), DaError> {
        self.passive.health_check().await
    }

    fn name(&self) -> String {
        format!("eager-{}", self.passive.name())
    }
}

#[async_trait]
impl StorageService for SyncingFallbackStorageService {
    async fn put(&self, data: &[u8], expiration: Timestamp) -> Result<(), DaError> {
        self.passive.put(data, expiration).await
    }

    async fn sync(&self) -> Result<(), DaError> {
        self.passive.sync().await
    }

    fn capabilities(&self) -> StorageCapabilities {
        self.passive.capabilities()
    }
}

#[async_trait]
impl Lifecycle for SyncingFallbackStorageService {
    fn component_name(&self) -> String {
        self.task.name().to_string()
    }

    async fn start(&self) -> Result<(), DaError> {
        let syncer = Arc::clone(&self.syncer);
        self.task.start(move || {
            let syncer = Arc::clone(&syncer);
            async move {
                match syncer.sync_once().await {
                    Ok(report) if report.examined > 0 => {
                        info!(
                            synced = report.synced,
                            present = report.present,
                            skipped = report.skipped,
                            retried = report.retried,
                            "[da-01] eager sync pass"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "[da-01] eager sync pass failed"),
                }
            }
        })
    }

    async fn stop(&self) -> Result<(), DaError> {
        self.task.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FallbackSettings;
    use crate::test_utils::ScriptedStorage;
    use shared_types::{Certificate, InMemoryChain, ManualClock};
    use std::time::Duration;

    const NOW: u64 = 10_000;
    const RETENTION: u64 = 1_000;

    struct Fixture {
        primary: Arc<ScriptedStorage>,
        backup: Arc<ScriptedStorage>,
        chain: Arc<InMemoryChain>,
        service: SyncingFallbackStorageService,
    }

    fn fixture() -> Fixture {
        let primary = Arc::new(ScriptedStorage::new("primary"));
        let backup = Arc::new(ScriptedStorage::new("backup"));
        let chain = Arc::new(InMemoryChain::new());
        let clock: Arc<dyn TimeSource> = Arc::new(ManualClock::new(NOW));
        let passive = FallbackStorageService::new(
            primary.clone(),
            backup.clone(),
            FallbackSettings {
                retention_period: Duration::from_secs(RETENTION),
                ignore_write_errors: false,
            },
            clock.clone(),
        );
        let service = SyncingFallbackStorageService::new(
            passive,
            Some(chain.clone() as Arc<dyn ChainReader>),
            EagerSyncSettings {
                start_height: 1,
                poll_interval: Duration::from_millis(10),
            },
            clock,
        )
        .unwrap();
        Fixture {
            primary,
            backup,
            chain,
            service,
        }
    }

    fn commit(height: u64, timestamp: u64, data: &[u8], expiration: u64) -> BatchCommitment {
        BatchCommitment {
            height,
            timestamp,
            certificate: Certificate {
                data_hash: DataHash::of(data),
                expiration,
                committee_height: height,
                signers_mask: 1,
                signature: [0u8; 96],
            },
        }
    }

    #[tokio::test]
    async fn test_pulls_committed_batches_without_any_read() {
        let f = fixture();
        f.backup.put(b"batch-1", u64::MAX).await.unwrap();
        f.chain.push_batch(commit(1, NOW - 10, b"batch-1", NOW + 5_000));

        let report = f.service.sync_once().await.unwrap();
        assert_eq!(report.synced, 1);
        let hash = DataHash::of(b"batch-1");
        assert!(f.primary.contains(&hash));
        // min(cert expiration, now + retention)
        assert_eq!(f.primary.expiration_of(&hash), Some(NOW + RETENTION));
        assert_eq!(f.service.next_height().await, 2);
    }

    #[tokio::test]
    async fn test_skips_expired_and_out_of_window_batches() {
        let f = fixture();
        f.backup.put(b"old", u64::MAX).await.unwrap();
        f.backup.put(b"expired", u64::MAX).await.unwrap();
        f.chain
            .push_batch(commit(1, NOW - RETENTION - 1, b"old", NOW + 5_000));
        f.chain.push_batch(commit(2, NOW, b"expired", NOW - 1));

        let report = f.service.sync_once().await.unwrap();
        assert_eq!(report.skipped, 2);
        assert!(f.primary.is_empty());
        assert_eq!(f.backup.gets(), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried_next_pass() {
        let f = fixture();
        f.chain.push_batch(commit(1, NOW, b"late", NOW + 50));

        let first = f.service.sync_once().await.unwrap();
        assert_eq!(first.retried, 1);
        assert_eq!(f.service.pending_retries().await, 1);

        f.backup.put(b"late", u64::MAX).await.unwrap();
        let second = f.service.sync_once().await.unwrap();
        assert_eq!(second.synced, 1);
        assert_eq!(f.service.pending_retries().await, 0);
        assert_eq!(f.primary.expiration_of(&DataHash::of(b"late")), Some(NOW + 50));
    }

    #[tokio::test]
    async fn test_present_entries_not_refetched() {
        let f = fixture();
        f.primary.put(b"have", u64::MAX).await.unwrap();
        f.chain.push_batch(commit(1, NOW, b"have", NOW + 50));
        let report = f.service.sync_once().await.unwrap();
        assert_eq!(report.present, 1);
        assert_eq!(f.backup.gets(), 0);
    }

    #[tokio::test]
    async fn test_missing_chain_reader_is_configuration_error() {
        let passive = FallbackStorageService::new(
            Arc::new(ScriptedStorage::new("p")),
            Arc::new(ScriptedStorage::new("b")),
            FallbackSettings::default(),
            Arc::new(ManualClock::new(0)),
        );
        assert!(matches!(
            SyncingFallbackStorageService::new(
                passive,
                None,
                EagerSyncSettings::default(),
                Arc::new(ManualClock::new(0)),
            ),
            Err(DaError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_background_task_syncs_via_lifecycle() {
        let f = fixture();
        f.backup.put(b"bg", u64::MAX).await.unwrap();
        f.chain.push_batch(commit(1, NOW, b"bg", NOW + 50));

        f.service.start().await.unwrap();
        let hash = DataHash::of(b"bg");
        for _ in 0..50 {
            if f.primary.contains(&hash) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        f.service.stop().await.unwrap();
        assert!(f.primary.contains(&hash));
    }
}
