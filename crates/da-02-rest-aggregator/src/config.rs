//! Aggregator settings.

use std::time::Duration;

/// Settings for the quorum reader over remote endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestAggregatorSettings {
    /// Number of endpoints that must return byte-identical content.
    pub quorum: usize,
    /// Per-endpoint request budget.
    pub request_timeout: Duration,
    /// Interval of the background health check.
    pub health_check_interval: Duration,
}

impl Default for RestAggregatorSettings {
    fn default() -> Self {
        Self {
            quorum: 1,
            request_timeout: Duration::from_secs(5),
            health_check_interval: Duration::from_secs(60),
        }
    }
}

/// Settings for partial-signature collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAggregatorSettings {
    /// Matching signatures required for a certificate.
    pub quorum: usize,
    /// Budget for the whole collection round.
    pub timeout: Duration,
    /// Committee height stamped on certificates when no chain reader is wired.
    pub committee_height: u64,
}

impl Default for StoreAggregatorSettings {
    fn default() -> Self {
        Self {
            quorum: 1,
            timeout: Duration::from_secs(10),
            committee_height: 0,
        }
    }
}
