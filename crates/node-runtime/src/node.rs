//! # DA Node
//!
//! Host-facing facade over a built graph. Every call runs under the
//! configured request deadline; dropping the returned future cancels all
//! in-flight work below it.

use crate::builder::{build_graph, Collaborators, CompositionPlan, DaGraph};
use crate::container::DataAvailabilityConfig;
use crate::registry::{LifecycleError, StartError};
use shared_types::{
    verify_content, Certificate, ComponentStatus, DaError, RetrieveKey, TimeSource,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A composed data-availability service.
pub struct DaNode {
    graph: DaGraph,
    request_timeout: Duration,
    clock: Arc<dyn TimeSource>,
}

impl DaNode {
    /// Build the graph for `config`. `Ok(None)` when DA is disabled.
    pub async fn build(
        config: &DataAvailabilityConfig,
        collaborators: &Collaborators,
    ) -> Result<Option<Self>, DaError> {
        let Some(graph) = build_graph(config, collaborators).await? else {
            return Ok(None);
        };
        Ok(Some(Self {
            graph,
            request_timeout: config.request_timeout(),
            clock: Arc::clone(&collaborators.clock),
        }))
    }

    pub fn plan(&self) -> &CompositionPlan {
        &self.graph.plan
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn can_write(&self) -> bool {
        self.graph.writer.is_some()
    }

    /// Store `payload` for at least `retention` from now.
    pub async fn store(&self, payload: &[u8], retention: Duration) -> Result<Certificate, DaError> {
        let writer = self
            .graph
            .writer
            .as_ref()
            .ok_or_else(|| DaError::Unsupported {
                service: format!("{:?}", self.graph.plan.role),
                operation: "store",
            })?;
        let expiration = self.clock.now().saturating_add(retention.as_secs());
        debug!(len = payload.len(), expiration, "[da] store");
        self.deadline("store", writer.store(payload, expiration)).await
    }

    /// Fetch a payload by certificate or by hash.
    pub async fn retrieve(&self, key: RetrieveKey) -> Result<Vec<u8>, DaError> {
        if let Some(validator) = &self.graph.validator {
            return self.deadline("retrieve", validator.retrieve(key)).await;
        }
        let hash = key.data_hash();
        self.deadline("retrieve", async {
            let data = self.graph.reader.get_by_hash(&hash).await?;
            verify_content(&hash, &data)?;
            Ok(data)
        })
        .await
    }

    pub async fn health_check(&self) -> Result<(), DaError> {
        self.deadline("health check", self.graph.reader.health_check())
            .await
    }

    pub async fn start(&self) -> Result<(), StartError> {
        self.graph.lifecycle.start().await?;
        info!(
            role = ?self.graph.plan.role,
            components = self.graph.lifecycle.len(),
            "[da] node started"
        );
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), LifecycleError> {
        let result = self.graph.lifecycle.stop().await;
        info!("[da] node stopped");
        result
    }

    pub fn statuses(&self) -> Vec<(String, ComponentStatus)> {
        self.graph.lifecycle.statuses()
    }

    pub fn print_status(&self) {
        info!("[da] layers: {}", self.graph.plan.describe().join(" -> "));
        self.graph.lifecycle.print_status();
    }

    async fn deadline<T>(
        &self,
        operation: &str,
        work: impl Future<Output = Result<T, DaError>>,
    ) -> Result<T, DaError> {
        tokio::time::timeout(self.request_timeout, work)
            .await
            .map_err(|_| DaError::Timeout {
                operation: operation.to_string(),
                millis: u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }
}

impl std::fmt::Debug for DaNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaNode")
            .field("graph", &self.graph)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
