//! Storage decorators composed by the node builder.

mod caching;
mod fallback;
mod iterable;
mod redundant;
mod regular_sync;
mod syncing_fallback;

pub use caching::{CacheStorageToDaAdapter, CachingStorageService};
pub use fallback::FallbackStorageService;
pub use iterable::IterableStorageService;
pub use redundant::RedundantStorageService;
pub use regular_sync::RegularSyncStorage;
pub use syncing_fallback::SyncingFallbackStorageService;
