//! # Replication Bookkeeping
//!
//! Cursor and retry state for the cross-replication daemon, plus the run
//! reports both background syncs return.

use shared_types::{BatchCommitment, DataHash, IterEntry};
use std::collections::{BTreeMap, HashMap};

/// Outcome of one cross-replication run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Source entries examined, including retries.
    pub scanned: usize,
    /// Successful destination writes.
    pub written: usize,
    /// Failed destination writes (queued for retry).
    pub failed: usize,
    /// Entries skipped because they expired.
    pub expired: usize,
}

/// Outcome of one eager-fallback poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EagerSyncReport {
    /// Commitments examined, including retries.
    pub examined: usize,
    /// Payloads copied into the primary store.
    pub synced: usize,
    /// Already present in the primary store.
    pub present: usize,
    /// Expired or outside the retention window.
    pub skipped: usize,
    /// Queued for the next poll.
    pub retried: usize,
}

/// Per-source cursors and per-(source, destination) retry queues.
#[derive(Debug, Default)]
pub struct ReplicationState {
    cursors: Vec<Option<u64>>,
    failed: BTreeMap<(usize, usize), Vec<IterEntry>>,
}

impl ReplicationState {
    pub fn new(sources: usize) -> Self {
        Self {
            cursors: vec![None; sources],
            failed: BTreeMap::new(),
        }
    }

    /// Last fully replicated position of `source`.
    pub fn cursor(&self, source: usize) -> Option<u64> {
        self.cursors.get(source).copied().flatten()
    }

    pub fn advance(&mut self, source: usize, position: u64) {
        if let Some(cursor) = self.cursors.get_mut(source) {
            *cursor = Some(cursor.map_or(position, |c| c.max(position)));
        }
    }

    pub fn record_failure(&mut self, source: usize, destination: usize, entry: IterEntry) {
        let queue = self.failed.entry((source, destination)).or_default();
        if !queue.iter().any(|e| e.hash == entry.hash) {
            queue.push(entry);
        }
    }

    /// Remove and return every queued retry for `source`, keyed by destination.
    pub fn take_failures(&mut self, source: usize) -> Vec<(usize, Vec<IterEntry>)> {
        let keys: Vec<(usize, usize)> = self
            .failed
            .keys()
            .filter(|(s, _)| *s == source)
            .copied()
            .collect();
        keys.into_iter()
            .filter_map(|key| self.failed.remove(&key).map(|entries| (key.1, entries)))
            .collect()
    }

    pub fn pending_failures(&self) -> usize {
        self.failed.values().map(Vec::len).sum()
    }
}

/// Chain cursor and retry list for the eager fallback.
#[derive(Debug)]
pub struct EagerSyncState {
    /// Next batch height to request from the chain.
    pub next_height: u64,
    retry: HashMap<DataHash, BatchCommitment>,
}

impl EagerSyncState {
    pub fn new(start_height: u64) -> Self {
        Self {
            next_height: start_height,
            retry: HashMap::new(),
        }
    }

    pub fn queue_retry(&mut self, batch: BatchCommitment) {
        self.retry.insert(batch.certificate.data_hash, batch);
    }

    pub fn take_retries(&mut self) -> Vec<BatchCommitment> {
        let mut batches: Vec<BatchCommitment> = self.retry.drain().map(|(_, b)| b).collect();
        batches.sort_by_key(|b| b.height);
        batches
    }

    pub fn pending_retries(&self) -> usize {
        self.retry.len()
    }
}
