//! External collaborators the builder wires into the graph.

use crate::container::BackendConfig;
use async_trait::async_trait;
use da_02_rest_aggregator::RemoteSigner;
use shared_types::{ChainReader, DaError, DaReader, StorageService, SystemTimeSource, TimeSource};
use std::sync::Arc;

/// Creates backends the workspace does not ship (object store, content store).
#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn create(&self, config: &BackendConfig) -> Result<Arc<dyn StorageService>, DaError>;
}

/// Everything the graph consumes but does not own.
#[derive(Clone)]
pub struct Collaborators {
    pub chain: Option<Arc<dyn ChainReader>>,
    /// Shared cache used by the `external` and `both` cache kinds.
    pub external_cache: Option<Arc<dyn StorageService>>,
    pub backend_factory: Option<Arc<dyn BackendFactory>>,
    pub clock: Arc<dyn TimeSource>,
    /// Replaces the HTTP readers built from `rest_aggregator.urls`.
    pub remote_readers: Option<Vec<Arc<dyn DaReader>>>,
    /// Replaces the HTTP signers built from `store_aggregator.signers`, by position.
    pub remote_signers: Option<Vec<Arc<dyn RemoteSigner>>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            chain: None,
            external_cache: None,
            backend_factory: None,
            clock: Arc::new(SystemTimeSource),
            remote_readers: None,
            remote_signers: None,
        }
    }
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, chain: Arc<dyn ChainReader>) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn with_external_cache(mut self, cache: Arc<dyn StorageService>) -> Self {
        self.external_cache = Some(cache);
        self
    }

    pub fn with_backend_factory(mut self, factory: Arc<dyn BackendFactory>) -> Self {
        self.backend_factory = Some(factory);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_remote_readers(mut self, readers: Vec<Arc<dyn DaReader>>) -> Self {
        self.remote_readers = Some(readers);
        self
    }

    pub fn with_remote_signers(mut self, signers: Vec<Arc<dyn RemoteSigner>>) -> Self {
        self.remote_signers = Some(signers);
        self
    }
}
