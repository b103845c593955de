//! Outbound ports of the aggregator.

pub mod outbound;

pub use outbound::{RemoteSigner, SignerEndpoint, SignerResponse};
