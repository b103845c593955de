//! Domain layer: quorum grouping, endpoint statistics and remote errors.

pub mod errors;
pub mod quorum;
pub mod stats;

pub use errors::ApiError;
pub use quorum::QuorumTally;
pub use stats::EndpointStats;
