//! # Quorum Reader
//!
//! Fans a lookup out to every remote endpoint and accepts the first group of
//! byte-identical answers that reaches the quorum threshold.
//!
//! ## Flow
//!
//! ```text
//! get(hash) ──┬──▶ endpoint 0 ─┐
//!             ├──▶ endpoint 1 ─┼──▶ group by Keccak(bytes) ──▶ first group ≥ Q
//!             └──▶ endpoint 2 ─┘
//! ```
//!
//! Outstanding requests are dropped as soon as the outcome is decided, and
//! every request is bounded by `request_timeout`.

use crate::config::RestAggregatorSettings;
use crate::domain::{EndpointStats, QuorumTally};
use async_trait::async_trait;
use da_01_storage::PeriodicTask;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use shared_types::{DaError, DaReader, DataHash, ExpirationPolicy, Lifecycle};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Reads from `n` remote endpoints, requiring `Q` agreeing responses.
pub struct QuorumRestAggregator {
    endpoints: Arc<Vec<Arc<dyn DaReader>>>,
    settings: RestAggregatorSettings,
    stats: Arc<RwLock<Vec<EndpointStats>>>,
    task: PeriodicTask,
}

impl QuorumRestAggregator {
    pub fn new(
        endpoints: Vec<Arc<dyn DaReader>>,
        settings: RestAggregatorSettings,
    ) -> Result<Self, DaError> {
        if endpoints.is_empty() {
            return Err(DaError::Configuration(
                "rest aggregator needs at least one endpoint".into(),
            ));
        }
        if settings.quorum == 0 || settings.quorum > endpoints.len() {
            return Err(DaError::Configuration(format!(
                "quorum {} must be between 1 and {} endpoints",
                settings.quorum,
                endpoints.len()
            )));
        }
        if settings.request_timeout.is_zero() {
            return Err(DaError::Configuration(
                "rest aggregator request timeout must be non-zero".into(),
            ));
        }

        let stats = endpoints
            .iter()
            .map(|e| EndpointStats::new(e.name()))
            .collect();
        let task = PeriodicTask::new("rest-aggregator-health", settings.health_check_interval);

        Ok(Self {
            endpoints: Arc::new(endpoints),
            settings,
            stats: Arc::new(RwLock::new(stats)),
            task,
        })
    }

    pub fn quorum(&self) -> usize {
        self.settings.quorum
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Snapshot of per-endpoint statistics.
    pub fn stats(&self) -> Vec<EndpointStats> {
        self.stats.read().clone()
    }

    /// Check every endpoint once and record the result.
    pub async fn check_health(&self) -> usize {
        check_endpoints(&self.endpoints, &self.stats).await
    }

    fn timeout_millis(&self) -> u64 {
        u64::try_from(self.settings.request_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

async fn check_endpoints(endpoints: &[Arc<dyn DaReader>], stats: &RwLock<Vec<EndpointStats>>) -> usize {
    let results = futures::future::join_all(endpoints.iter().map(|e| e.health_check())).await;
    let mut stats = stats.write();
    let mut healthy = 0;
    for (i, result) in results.into_iter().enumerate() {
        let ok = result.is_ok();
        if let Err(e) = result {
            debug!(endpoint = %stats[i].endpoint, error = %e, "[da-02] health check failed");
        }
        stats[i].healthy = ok;
        healthy += usize::from(ok);
    }
    healthy
}

#[async_trait]
impl DaReader for QuorumRestAggregator {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        let quorum = self.settings.quorum;
        let timeout = self.settings.request_timeout;

        let mut pending: FuturesUnordered<_> = self
            .endpoints
            .iter()
            .enumerate()
            .map(|(i, endpoint)| {
                let endpoint = Arc::clone(endpoint);
                let hash = *hash;
                async move {
                    let started = Instant::now();
                    let result = tokio::time::timeout(timeout, endpoint.get_by_hash(&hash)).await;
                    (i, started.elapsed(), result)
                }
            })
            .collect();

        let mut tally: QuorumTally<DataHash, Vec<u8>> = QuorumTally::new(quorum);
        let mut errors: Vec<DaError> = Vec::new();
        let mut outstanding = self.endpoints.len();

        while let Some((i, elapsed, result)) = pending.next().await {
            outstanding -= 1;
            match result {
                Ok(Ok(data)) => {
                    self.stats.write()[i].record_success(elapsed);
                    let actual = DataHash::of(&data);
                    if tally.add(actual, data) >= quorum {
                        if actual != *hash {
                            warn!(expected = %hash, %actual, "[da-02] quorum agreed on wrong content");
                            return Err(DaError::ContentMismatch {
                                expected: *hash,
                                actual,
                            });
                        }
                        debug!(%hash, responses = tally.count(&actual), "[da-02] quorum reached");
                        return tally
                            .members(&actual)
                            .first()
                            .cloned()
                            .ok_or_else(|| DaError::quorum("empty winning group"));
                    }
                }
                Ok(Err(e)) => {
                    self.stats.write()[i].record_failure(elapsed);
                    debug!(endpoint = i, error = %e, "[da-02] endpoint read failed");
                    errors.push(e);
                }
                Err(_) => {
                    self.stats.write()[i].record_timeout();
                    errors.push(DaError::Timeout {
                        operation: format!("get from {}", self.endpoints[i].name()),
                        millis: self.timeout_millis(),
                    });
                }
            }
            if tally.unreachable(outstanding) {
                break;
            }
        }

        if errors.len() == self.endpoints.len() && errors.iter().all(DaError::is_not_found) {
            return Err(DaError::NotFound { hash: *hash });
        }
        Err(DaError::quorum(format!(
            "{} of {} endpoints agreed on {} (quorum {}), {} failed",
            tally.largest(),
            self.endpoints.len(),
            hash,
            quorum,
            errors.len()
        )))
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        Ok(ExpirationPolicy::DiscardAfterDataTimeout)
    }

    async fn health_check(&self) -> Result<(), DaError> {
        let healthy = self.check_health().await;
        if healthy >= self.settings.quorum {
            Ok(())
        } else {
            Err(DaError::quorum(format!(
                "{} healthy endpoints, quorum {}",
                healthy, self.settings.quorum
            )))
        }
    }

    fn name(&self) -> String {
        format!(
            "rest-aggregator({}/{})",
            self.settings.quorum,
            self.endpoints.len()
        )
    }
}

#[async_trait]
impl Lifecycle for QuorumRestAggregator {
    fn component_name(&self) -> String {
        self.task.name().to_string()
    }

    async fn start(&self) -> Result<(), DaError> {
        let endpoints = Arc::clone(&self.endpoints);
        let stats = Arc::clone(&self.stats);
        let quorum = self.settings.quorum;
        self.task.start(move || {
            let endpoints = Arc::clone(&endpoints);
            let stats = Arc::clone(&stats);
            async move {
                let healthy = check_endpoints(&endpoints, &stats).await;
                if healthy < quorum {
                    warn!(healthy, quorum, "[da-02] fewer healthy endpoints than quorum");
                }
            }
        })
    }

    async fn stop(&self) -> Result<(), DaError> {
        self.task.stop().await
    }
}
