//! Storage Adapters
//!
//! Leaf implementations of the `StorageService` port, plus the read-limited
//! wrappers that let a reader stand in for a store or a DA service.

mod empty;
mod local_file;
mod lru_cache;
mod memory;
mod read_limited;
#[cfg(feature = "rocksdb")]
mod rocks_db;

pub use empty::EmptyStorageService;
pub use local_file::LocalFileStorageService;
pub use lru_cache::LruStorageService;
pub use memory::InMemoryStorageService;
pub use read_limited::{ReadLimitedDaService, ReadLimitedStorageService};
#[cfg(feature = "rocksdb")]
pub use rocks_db::{RocksDbConfig, RocksDbStorageService, CF_EXPIRATIONS, CF_PAYLOADS};
