//! # Quorum REST Aggregation
//!
//! Reads from and certifies through a set of remote committee members.
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | `QuorumRestAggregator` | `DaReader` accepting the first group of `Q` byte-identical answers |
//! | `QuorumStoreAggregator` | `DaWriter` aggregating `Q` verified partial signatures into a certificate |
//! | `RestfulDasClient` | HTTP `DaReader` for one member |
//! | `RestSignerClient` | HTTP `RemoteSigner` for one member |
//!
//! ## Guarantees
//!
//! - Every remote request is bounded by a timeout; one unresponsive peer
//!   never blocks a request other members can satisfy.
//! - Outstanding requests are dropped once the outcome is decided.
//! - A quorum agreeing on bytes that do not hash to the requested key is a
//!   `ContentMismatch`, never a success.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{RestSignerClient, RestfulDasClient};
pub use config::{RestAggregatorSettings, StoreAggregatorSettings};
pub use domain::{ApiError, EndpointStats, QuorumTally};
pub use ports::{RemoteSigner, SignerEndpoint, SignerResponse};
pub use service::{QuorumRestAggregator, QuorumStoreAggregator, MAX_SIGNERS};
