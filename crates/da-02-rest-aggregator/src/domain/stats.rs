//! Per-endpoint request statistics.

use std::time::Duration;

/// Counters for one remote endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointStats {
    pub endpoint: String,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub last_latency: Option<Duration>,
    /// Result of the most recent health check.
    pub healthy: bool,
}

impl EndpointStats {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            healthy: true,
            ..Self::default()
        }
    }

    pub fn record_success(&mut self, latency: Duration) {
        self.successes += 1;
        self.last_latency = Some(latency);
    }

    pub fn record_failure(&mut self, latency: Duration) {
        self.failures += 1;
        self.last_latency = Some(latency);
    }

    pub fn record_timeout(&mut self) {
        self.timeouts += 1;
    }

    pub fn total(&self) -> u64 {
        self.successes + self.failures + self.timeouts
    }
}
