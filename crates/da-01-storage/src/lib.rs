//! # DA-01 Storage Composition
//!
//! Leaf storage adapters and the storage-level decorators of the
//! data-availability graph. Every type here speaks the uniform
//! `StorageService` contract from `shared-types`, so decorators stack in any
//! order the builder chooses.
//!
//! ## Decorators
//!
//! | Type | Role |
//! |------|------|
//! | `RedundantStorageService` | fan-out writes, ordered fan-in reads |
//! | `FallbackStorageService` | primary store, backup reader, backfill unless write errors are ignored |
//! | `SyncingFallbackStorageService` | fallback plus eager pull of committed batches |
//! | `CachingStorageService` | read-through/write-through cache over a store |
//! | `CacheStorageToDaAdapter` | the same cache over a full DA service |
//! | `IterableStorageService` | records insertion order so a store is enumerable |
//! | `RegularSyncStorage` | background cross-replication between backends |
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Content Addressing | Bytes returned always hash to the requested key |
//! | 2 | Monotonic Retention | Re-storing never shortens an expiration |
//! | 3 | No Silent Repair | A content mismatch is an error, never corrected |
//! | 4 | Drop Cancels | No request-path work is spawned; dropping a future cancels it |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - decorator settings and replication bookkeeping
//! - `adapters/` - leaf stores (memory, local file, LRU, empty, read-limited, rocksdb)
//! - `service/` - decorators composed by the node builder
//! - `daemon.rs` - periodic background task driven by the lifecycle manager

pub mod adapters;
pub mod daemon;
pub mod domain;
pub mod service;

/// Scripted storage doubles. Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{
    EmptyStorageService, InMemoryStorageService, LocalFileStorageService, LruStorageService,
    ReadLimitedDaService, ReadLimitedStorageService,
};
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStorageService};
pub use daemon::PeriodicTask;
pub use domain::{
    CacheSettings, EagerSyncReport, EagerSyncSettings, FallbackSettings, ReplicationSettings,
    SyncReport,
};
pub use service::{
    CacheStorageToDaAdapter, CachingStorageService, FallbackStorageService,
    IterableStorageService, RedundantStorageService, RegularSyncStorage,
    SyncingFallbackStorageService,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
