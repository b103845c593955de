//! # Cross-Replication Daemon
//!
//! Periodically copies entries from a set of enumerable sources into a set
//! of destinations.
//!
//! ## Per-run Algorithm
//!
//! 1. Prune expired entries from each source's log, then retry queued
//!    `(source, destination)` failures.
//! 2. Page each source from its cursor; for every entry read the payload once
//!    and write it to every destination other than the source itself.
//! 3. Advance the cursor past each entry; writes that failed are queued.
//!
//! Only the cursor state is locked, so foreground traffic is never blocked.

use crate::daemon::PeriodicTask;
use crate::domain::sync_state::ReplicationState;
use crate::domain::{ReplicationSettings, SyncReport};
use async_trait::async_trait;
use shared_types::{
    DaError, IterEntry, IterableStorage, Lifecycle, StorageService, TimeSource,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct Replicator {
    sources: Vec<Arc<dyn IterableStorage>>,
    destinations: Vec<Arc<dyn StorageService>>,
    batch_size: usize,
    clock: Arc<dyn TimeSource>,
    state: Mutex<ReplicationState>,
}

impl Replicator {
    async fn run_once(&self) -> SyncReport {
        let mut state = self.state.lock().await;
        let mut report = SyncReport::default();
        let now = self.clock.now();

        for (si, source) in self.sources.iter().enumerate() {
            report.expired += source.prune_expired(now).await;
            for (di, entries) in state.take_failures(si) {
                for entry in entries {
                    report.scanned += 1;
                    if entry.expiration < now {
                        report.expired += 1;
                        continue;
                    }
                    let ok = self
                        .copy(source.as_ref(), &entry, &[di], &mut state, si, &mut report)
                        .await;
                    if !ok {
                        debug!(source = %source.name(), hash = %entry.hash, "[da-01] retry still failing");
                    }
                }
            }

            loop {
                let cursor = state.cursor(si);
                let page = match source.entries_after(cursor, self.batch_size).await {
                    Ok(page) => page,
                    Err(e) => {
                        warn!(source = %source.name(), error = %e, "[da-01] replication source enumeration failed");
                        break;
                    }
                };
                let page_len = page.len();
                for entry in page {
                    report.scanned += 1;
                    if entry.expiration < now {
                        report.expired += 1;
                    } else {
                        let targets: Vec<usize> = (0..self.destinations.len()).collect();
                        self.copy(source.as_ref(), &entry, &targets, &mut state, si, &mut report)
                            .await;
                    }
                    state.advance(si, entry.position);
                }
                if page_len < self.batch_size {
                    break;
                }
            }
        }
        report
    }

    /// Copy one entry to the given destinations. Returns true when every
    /// write succeeded.
    async fn copy(
        &self,
        source: &dyn IterableStorage,
        entry: &IterEntry,
        targets: &[usize],
        state: &mut ReplicationState,
        si: usize,
        report: &mut SyncReport,
    ) -> bool {
        let source_name = source.name();
        let targets: Vec<usize> = targets
            .iter()
            .copied()
            .filter(|&di| {
                self.destinations
                    .get(di)
                    .is_some_and(|d| d.name() != source_name)
            })
            .collect();
        if targets.is_empty() {
            return true;
        }

        let data = match source.get_by_hash(&entry.hash).await {
            Ok(data) => data,
            Err(e) => {
                warn!(source = %source_name, hash = %entry.hash, error = %e, "[da-01] replication read failed");
                for di in targets {
                    report.failed += 1;
                    state.record_failure(si, di, *entry);
                }
                return false;
            }
        };

        let mut all_ok = true;
        for di in targets {
            let destination = &self.destinations[di];
            match destination.put(&data, entry.expiration).await {
                Ok(()) => report.written += 1,
                Err(e) => {
                    warn!(
                        source = %source_name,
                        destination = %destination.name(),
                        hash = %entry.hash,
                        error = %e,
                        "[da-01] replication write failed"
                    );
                    report.failed += 1;
                    state.record_failure(si, di, *entry);
                    all_ok = false;
                }
            }
        }
        all_ok
    }
}

/// Background replication between storage backends.
pub struct RegularSyncStorage {
    replicator: Arc<Replicator>,
    task: PeriodicTask,
}

impl RegularSyncStorage {
    pub fn new(
        sources: Vec<Arc<dyn IterableStorage>>,
        destinations: Vec<Arc<dyn StorageService>>,
        settings: ReplicationSettings,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, DaError> {
        if sources.is_empty() || destinations.is_empty() {
            return Err(DaError::Configuration(
                "replication needs at least one source and one destination".into(),
            ));
        }
        if settings.batch_size == 0 {
            return Err(DaError::Configuration(
                "replication batch size must be non-zero".into(),
            ));
        }
        let state = ReplicationState::new(sources.len());
        Ok(Self {
            replicator: Arc::new(Replicator {
                sources,
                destinations,
                batch_size: settings.batch_size,
                clock,
                state: Mutex::new(state),
            }),
            task: PeriodicTask::new("regular-sync", settings.interval),
        })
    }

    /// Run one replication pass now.
    pub async fn run_once(&self) -> SyncReport {
        self.replicator.run_once().await
    }

    pub async fn pending_failures(&self) -> usize {
        self.replicator.state.lock().await.pending_failures()
    }
}

#[async_trait]
impl Lifecycle for RegularSyncStorage {
    fn component_name(&self) -> String {
        self.task.name().to_string()
    }

    async fn start(&self) -> Result<(), DaError> {
        let replicator = Arc::clone(&self.replicator);
        self.task.start(move || {
            let replicator = Arc::clone(&replicator);
            async move {
                let report = replicator.run_once().await;
                if report.written > 0 || report.failed > 0 {
                    info!(
                        scanned = report.scanned,
                        written = report.written,
                        failed = report.failed,
                        expired = report.expired,
                        "[da-01] replication pass"
                    );
                }
            }
        })
    }

    async fn stop(&self) -> Result<(), DaError> {
        self.task.stop().await
    }
}
