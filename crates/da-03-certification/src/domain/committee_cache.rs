//! Bounded cache of committees by height.

use lru::LruCache;
use parking_lot::Mutex;
use shared_types::CommitteeInfo;
use std::num::NonZeroUsize;

pub struct CommitteeCache {
    entries: Mutex<LruCache<u64, CommitteeInfo>>,
}

impl CommitteeCache {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, height: u64) -> Option<CommitteeInfo> {
        self.entries.lock().get(&height).cloned()
    }

    pub fn insert(&self, height: u64, committee: CommitteeInfo) {
        self.entries.lock().put(height, committee);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
