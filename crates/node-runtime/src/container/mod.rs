//! # Configuration Container
//!
//! The declarative configuration from which the DA graph is planned and
//! built.

pub mod config;

pub use config::{
    BackendConfig, BackendKind, CacheConfig, CacheKind, ConfigError, ConnectionParams,
    DataAvailabilityConfig, FallbackConfig, NodeRole, ReplicationConfig, RestAggregatorConfig,
    SignerConfig, SigningConfig, StoreAggregatorConfig, ValidationConfig,
};
