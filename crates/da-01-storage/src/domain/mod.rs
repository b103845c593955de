//! Domain layer: decorator settings and replication bookkeeping.

pub mod settings;
pub mod sync_state;

pub use settings::{CacheSettings, EagerSyncSettings, FallbackSettings, ReplicationSettings};
pub use sync_state::{EagerSyncReport, SyncReport};
