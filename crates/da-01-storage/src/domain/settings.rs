//! # Decorator Settings
//!
//! Runtime settings for each storage decorator. The node builder derives
//! these from the validated configuration file.

use std::time::Duration;

/// Passive fallback behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackSettings {
    /// Retention applied to payloads copied into the primary store.
    pub retention_period: Duration,
    /// Swallow primary write failures instead of propagating them. A primary
    /// that may drop writes is never backfilled.
    pub ignore_write_errors: bool,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            retention_period: Duration::from_secs(21 * 24 * 60 * 60),
            ignore_write_errors: false,
        }
    }
}

impl FallbackSettings {
    /// Whether backup hits are copied into the primary store.
    pub fn backfills(&self) -> bool {
        !self.ignore_write_errors
    }
}

/// Eager (chain-driven) fallback behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EagerSyncSettings {
    /// First batch height to examine.
    pub start_height: u64,
    /// Delay between chain polls.
    pub poll_interval: Duration,
}

impl Default for EagerSyncSettings {
    fn default() -> Self {
        Self {
            start_height: 0,
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// Cache decorator behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// How long a populated entry stays in the cache.
    pub expiration: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            expiration: Duration::from_secs(60 * 60),
        }
    }
}

/// Cross-replication daemon behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationSettings {
    /// Delay between replication runs.
    pub interval: Duration,
    /// Entries requested from a source per page.
    pub batch_size: usize,
}

impl Default for ReplicationSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            batch_size: 100,
        }
    }
}

impl ReplicationSettings {
    /// Short interval and small pages for tests.
    pub fn for_testing() -> Self {
        Self {
            interval: Duration::from_millis(10),
            batch_size: 2,
        }
    }
}
