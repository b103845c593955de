//! # Graph Builder
//!
//! Walks a `CompositionPlan` bottom-up, instantiating each layer over the
//! ones below it and registering background components with the
//! `LifecycleManager`. Nothing is started here; a failure at any layer
//! aborts the build before any component runs.

use super::collaborators::Collaborators;
use super::plan::{plan, CompositionPlan, PlanStep};
use crate::container::{BackendConfig, BackendKind, CacheKind, DataAvailabilityConfig};
use crate::registry::LifecycleManager;
use async_trait::async_trait;
use da_01_storage::{
    CacheSettings, CacheStorageToDaAdapter, CachingStorageService, EagerSyncSettings,
    EmptyStorageService, FallbackSettings, FallbackStorageService, InMemoryStorageService,
    IterableStorageService, LocalFileStorageService, LruStorageService,
    ReadLimitedStorageService, RedundantStorageService, RegularSyncStorage,
    ReplicationSettings, SyncingFallbackStorageService,
};
use da_02_rest_aggregator::{
    QuorumRestAggregator, QuorumStoreAggregator, RemoteSigner, RestAggregatorSettings,
    RestSignerClient, RestfulDasClient, SignerEndpoint, StoreAggregatorSettings,
};
use da_03_certification::{
    CertifyingWriter, CertifyingWriterSettings, ChainValidatingReader, ValidationSettings,
};
use shared_crypto::{BlsKeyPair, BlsPublicKey, BlsSecretKey};
use shared_types::{
    DaError, DaReader, DaService, DaWriter, DataHash, ExpirationPolicy,
    IterableStorage, StorageService,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The assembled graph and the lifecycle of its background components.
pub struct DaGraph {
    pub plan: CompositionPlan,
    /// Top of the read path.
    pub reader: Arc<dyn DaReader>,
    /// Top of the write path, when the role writes.
    pub writer: Option<Arc<dyn DaWriter>>,
    /// Certificate-checking reader, when validation is enabled.
    pub validator: Option<Arc<ChainValidatingReader>>,
    pub lifecycle: LifecycleManager,
}

impl std::fmt::Debug for DaGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaGraph")
            .field("plan", &self.plan.describe())
            .field("reader", &self.reader.name())
            .field("writer", &self.writer.is_some())
            .field("components", &self.lifecycle.len())
            .finish()
    }
}

/// Plan and build in one call. `Ok(None)` when DA is disabled.
pub async fn build_graph(
    config: &DataAvailabilityConfig,
    collaborators: &Collaborators,
) -> Result<Option<DaGraph>, DaError> {
    let Some(plan) = plan(config).map_err(|e| DaError::Configuration(e.to_string()))? else {
        info!("[da] data availability disabled");
        return Ok(None);
    };
    build(config, plan, collaborators).await.map(Some)
}

/// Reader view of a store; trait objects do not upcast.
struct StorageReader(Arc<dyn StorageService>);

#[async_trait]
impl DaReader for StorageReader {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        self.0.get_by_hash(hash).await
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        self.0.expiration_policy().await
    }

    async fn health_check(&self) -> Result<(), DaError> {
        self.0.health_check().await
    }

    fn name(&self) -> String {
        self.0.name()
    }
}

/// Full DA service with its reader and writer views.
#[derive(Clone)]
struct ServiceHandles {
    service: Arc<dyn DaService>,
    reader: Arc<dyn DaReader>,
    writer: Arc<dyn DaWriter>,
}

impl ServiceHandles {
    fn of<T: DaReader + DaWriter + 'static>(service: Arc<T>) -> Self {
        Self {
            service: service.clone(),
            reader: service.clone(),
            writer: service,
        }
    }
}

#[derive(Default)]
struct Stack {
    leaves: Vec<(String, Arc<dyn StorageService>)>,
    iterables: Vec<(String, Arc<dyn IterableStorage>)>,
    storage: Option<Arc<dyn StorageService>>,
    rest: Option<Arc<QuorumRestAggregator>>,
    service: Option<ServiceHandles>,
    writer: Option<Arc<dyn DaWriter>>,
    validator: Option<Arc<ChainValidatingReader>>,
}

impl Stack {
    fn storage(&self, layer: &str) -> Result<Arc<dyn StorageService>, DaError> {
        self.storage
            .clone()
            .ok_or_else(|| DaError::Configuration(format!("{} needs a storage layer below it", layer)))
    }
}

/// Instantiate every layer of `plan`, leaves first.
pub async fn build(
    config: &DataAvailabilityConfig,
    plan: CompositionPlan,
    collaborators: &Collaborators,
) -> Result<DaGraph, DaError> {
    let lifecycle = LifecycleManager::new();
    let clock = Arc::clone(&collaborators.clock);
    let mut stack = Stack::default();

    for step in &plan.steps {
        info!(layer = %step, "[da] building layer");
        match step {
            PlanStep::Backend { config: backend, iterable } => {
                let leaf = create_backend(backend, collaborators).await?;
                let leaf: Arc<dyn StorageService> = if *iterable {
                    let wrapped = Arc::new(IterableStorageService::new(leaf));
                    let iterable: Arc<dyn IterableStorage> = wrapped.clone();
                    stack.iterables.push((backend.name.clone(), iterable));
                    wrapped
                } else {
                    leaf
                };
                stack.leaves.push((backend.name.clone(), leaf.clone()));
                stack.storage = Some(leaf);
            }
            PlanStep::Redundant { .. } => {
                let members = stack.leaves.iter().map(|(_, s)| s.clone()).collect();
                stack.storage = Some(Arc::new(RedundantStorageService::new(members)?));
            }
            PlanStep::Replication {
                sources,
                destinations,
            } => {
                let sources = sources
                    .iter()
                    .map(|name| lookup(&stack.iterables, name))
                    .collect::<Result<Vec<_>, _>>()?;
                let destinations = destinations
                    .iter()
                    .map(|name| lookup(&stack.leaves, name))
                    .collect::<Result<Vec<_>, _>>()?;
                let settings = ReplicationSettings {
                    interval: Duration::from_secs(config.replication.interval_secs),
                    batch_size: config.replication.batch_size,
                };
                let daemon = Arc::new(RegularSyncStorage::new(
                    sources,
                    destinations,
                    settings,
                    clock.clone(),
                )?);
                lifecycle.register(daemon);
            }
            PlanStep::RestAggregator { .. } => {
                let aggregator = Arc::new(rest_aggregator(config, collaborators)?);
                lifecycle.register(aggregator.clone());
                if stack.storage.is_none() {
                    stack.storage = Some(Arc::new(ReadLimitedStorageService::new(
                        aggregator.clone(),
                    )));
                }
                stack.rest = Some(aggregator);
            }
            PlanStep::Fallback { eager } => {
                let primary = stack.storage("fallback")?;
                let backup: Arc<dyn DaReader> = stack
                    .rest
                    .clone()
                    .ok_or_else(|| DaError::Configuration("fallback needs the REST aggregator".into()))?;
                let settings = FallbackSettings {
                    retention_period: Duration::from_secs(config.fallback.retention_period_secs),
                    ignore_write_errors: config.fallback.ignore_write_errors,
                };
                let passive = FallbackStorageService::new(primary, backup, settings, clock.clone());
                if *eager {
                    let syncing = Arc::new(SyncingFallbackStorageService::new(
                        passive,
                        collaborators.chain.clone(),
                        EagerSyncSettings {
                            start_height: config.fallback.eager_start_height,
                            poll_interval: Duration::from_secs(
                                config.fallback.eager_poll_interval_secs,
                            ),
                        },
                        clock.clone(),
                    )?);
                    lifecycle.register(syncing.clone());
                    stack.storage = Some(syncing);
                } else {
                    stack.storage = Some(Arc::new(passive));
                }
            }
            PlanStep::EmptyStorage => {
                stack.storage = Some(Arc::new(EmptyStorageService::new()));
            }
            PlanStep::CertifyingWriter { .. } => {
                let writer = certifying_writer(config, stack.storage("certifying writer")?, collaborators)?;
                stack.service = Some(ServiceHandles::of(Arc::new(writer)));
            }
            PlanStep::StoreAggregator { .. } => {
                stack.writer = Some(Arc::new(store_aggregator(config, collaborators)?));
            }
            PlanStep::Cache { kind } => {
                let settings = CacheSettings {
                    expiration: Duration::from_secs(config.cache.expiration_secs),
                };
                for cache in cache_layers(*kind, config, collaborators)? {
                    if let Some(service) = &stack.service {
                        let adapter = CacheStorageToDaAdapter::new(
                            cache,
                            service.service.clone(),
                            settings,
                            clock.clone(),
                        );
                        stack.service = Some(ServiceHandles::of(Arc::new(adapter)));
                    } else {
                        let target = stack.storage("cache")?;
                        stack.storage = Some(Arc::new(CachingStorageService::new(
                            cache,
                            target,
                            settings,
                            clock.clone(),
                        )));
                    }
                }
            }
            PlanStep::ChainValidation { .. } => {
                let chain = collaborators.chain.clone().ok_or_else(|| {
                    DaError::Configuration("chain validation requires a chain reader".into())
                })?;
                let inner = top_reader(&stack)?;
                let settings = ValidationSettings {
                    quorum_threshold: config.validation.quorum_threshold,
                    allow_hash_reads: config.validation.allow_hash_reads,
                    chain_timeout: Duration::from_millis(config.validation.chain_timeout_ms),
                    committee_cache_size: config.validation.committee_cache_size,
                };
                stack.validator = Some(Arc::new(ChainValidatingReader::new(
                    inner,
                    chain,
                    settings,
                    clock.clone(),
                )));
            }
        }
    }

    let reader: Arc<dyn DaReader> = match &stack.validator {
        Some(validator) => validator.clone(),
        None => top_reader(&stack)?,
    };
    let writer = stack
        .service
        .as_ref()
        .map(|s| s.writer.clone())
        .or_else(|| stack.writer.clone());

    info!(
        role = ?plan.role,
        layers = plan.steps.len(),
        components = lifecycle.len(),
        reader = %reader.name(),
        "[da] graph built"
    );

    Ok(DaGraph {
        plan,
        reader,
        writer,
        validator: stack.validator,
        lifecycle,
    })
}

fn top_reader(stack: &Stack) -> Result<Arc<dyn DaReader>, DaError> {
    if let Some(service) = &stack.service {
        return Ok(service.reader.clone());
    }
    let storage = stack.storage("reader")?;
    Ok(Arc::new(StorageReader(storage)))
}

fn lookup<T: ?Sized>(entries: &[(String, Arc<T>)], name: &str) -> Result<Arc<T>, DaError> {
    entries
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, s)| s.clone())
        .ok_or_else(|| DaError::Configuration(format!("unknown backend {}", name)))
}

async fn create_backend(
    backend: &BackendConfig,
    collaborators: &Collaborators,
) -> Result<Arc<dyn StorageService>, DaError> {
    let clock = Arc::clone(&collaborators.clock);
    match backend.kind {
        BackendKind::Memory => Ok(Arc::new(InMemoryStorageService::with_clock(
            backend.name.clone(),
            backend.discard_after_timeout,
            clock,
        ))),
        BackendKind::LocalFile => {
            let dir = data_dir(backend)?;
            let store = LocalFileStorageService::open(
                backend.name.clone(),
                dir,
                backend.discard_after_timeout,
                clock,
            )
            .await?;
            Ok(Arc::new(store))
        }
        BackendKind::Database => open_database(backend, collaborators).await,
        BackendKind::ObjectStore | BackendKind::ContentStore => {
            from_factory(backend, collaborators).await
        }
    }
}

fn data_dir(backend: &BackendConfig) -> Result<&std::path::Path, DaError> {
    backend.connection.data_dir.as_deref().ok_or_else(|| {
        DaError::Configuration(format!("backend {} needs connection.data_dir", backend.name))
    })
}

#[cfg(feature = "rocksdb")]
async fn open_database(
    backend: &BackendConfig,
    collaborators: &Collaborators,
) -> Result<Arc<dyn StorageService>, DaError> {
    use da_01_storage::{RocksDbConfig, RocksDbStorageService};

    let config = RocksDbConfig {
        path: data_dir(backend)?.display().to_string(),
        discard_after_timeout: backend.discard_after_timeout,
        ..RocksDbConfig::default()
    };
    let store = RocksDbStorageService::open(
        backend.name.clone(),
        config,
        Arc::clone(&collaborators.clock),
    )?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "rocksdb"))]
async fn open_database(
    backend: &BackendConfig,
    collaborators: &Collaborators,
) -> Result<Arc<dyn StorageService>, DaError> {
    from_factory(backend, collaborators).await
}

async fn from_factory(
    backend: &BackendConfig,
    collaborators: &Collaborators,
) -> Result<Arc<dyn StorageService>, DaError> {
    let factory = collaborators.backend_factory.as_ref().ok_or_else(|| {
        DaError::Configuration(format!(
            "backend {} of kind {:?} needs a backend factory",
            backend.name, backend.kind
        ))
    })?;
    factory.create(backend).await
}

fn rest_aggregator(
    config: &DataAvailabilityConfig,
    collaborators: &Collaborators,
) -> Result<QuorumRestAggregator, DaError> {
    let rest = &config.rest_aggregator;
    let timeout = Duration::from_millis(rest.request_timeout_ms);
    let endpoints: Vec<Arc<dyn DaReader>> = match &collaborators.remote_readers {
        Some(readers) => readers.clone(),
        None => rest
            .urls
            .iter()
            .map(|url| {
                RestfulDasClient::new(url.clone(), timeout)
                    .map(|c| Arc::new(c) as Arc<dyn DaReader>)
                    .map_err(|e| DaError::Configuration(format!("REST client {}: {}", url, e)))
            })
            .collect::<Result<_, _>>()?,
    };
    QuorumRestAggregator::new(
        endpoints,
        RestAggregatorSettings {
            quorum: rest.quorum_threshold,
            request_timeout: timeout,
            health_check_interval: Duration::from_secs(rest.health_check_interval_secs),
        },
    )
}

fn store_aggregator(
    config: &DataAvailabilityConfig,
    collaborators: &Collaborators,
) -> Result<QuorumStoreAggregator, DaError> {
    let store = &config.store_aggregator;
    let timeout = Duration::from_millis(store.timeout_ms);

    let mut endpoints = Vec::with_capacity(store.signers.len());
    for (position, signer) in store.signers.iter().enumerate() {
        let public_key = BlsPublicKey::from_hex(&signer.public_key)
            .map_err(|e| DaError::Configuration(format!("signer {} key: {}", signer.url, e)))?
            .to_bytes();
        let client: Arc<dyn RemoteSigner> = match &collaborators.remote_signers {
            Some(signers) => signers.get(position).cloned().ok_or_else(|| {
                DaError::Configuration(format!("no remote signer for position {}", position))
            })?,
            None => Arc::new(
                RestSignerClient::new(signer.url.clone(), timeout).map_err(|e| {
                    DaError::Configuration(format!("signer client {}: {}", signer.url, e))
                })?,
            ),
        };
        endpoints.push(SignerEndpoint {
            index: signer.index,
            public_key,
            signer: client,
        });
    }

    QuorumStoreAggregator::new(
        endpoints,
        StoreAggregatorSettings {
            quorum: store.quorum_threshold,
            timeout,
            committee_height: store.committee_height,
        },
        collaborators.chain.clone(),
    )
}

fn certifying_writer(
    config: &DataAvailabilityConfig,
    storage: Arc<dyn StorageService>,
    collaborators: &Collaborators,
) -> Result<CertifyingWriter, DaError> {
    let key = config
        .signing
        .key_material
        .as_deref()
        .ok_or_else(|| DaError::Configuration("certifying writer needs key material".into()))?;
    let secret = BlsSecretKey::from_hex(key)
        .map_err(|e| DaError::Configuration(format!("signing key: {}", e)))?;
    let keys = BlsKeyPair::from_secret(&secret)
        .map_err(|e| DaError::Configuration(format!("signing key: {}", e)))?;

    CertifyingWriter::new(
        storage,
        keys,
        CertifyingWriterSettings {
            signer_index: config.signing.signer_index,
            require_chain_authorization: config.signing.require_chain_authorization,
            chain_timeout: Duration::from_millis(config.validation.chain_timeout_ms),
        },
        collaborators.chain.clone(),
    )
}

/// Cache stores innermost first: `both` puts the local LRU above the
/// external cache.
fn cache_layers(
    kind: CacheKind,
    config: &DataAvailabilityConfig,
    collaborators: &Collaborators,
) -> Result<Vec<Arc<dyn StorageService>>, DaError> {
    let external = || {
        collaborators.external_cache.clone().ok_or_else(|| {
            DaError::Configuration("external cache requested but none supplied".into())
        })
    };
    let local = || -> Result<Arc<dyn StorageService>, DaError> {
        Ok(Arc::new(LruStorageService::new(
            config.cache.capacity,
            Arc::clone(&collaborators.clock),
        )?))
    };
    match kind {
        CacheKind::Local => Ok(vec![local()?]),
        CacheKind::External => Ok(vec![external()?]),
        CacheKind::Both => Ok(vec![external()?, local()?]),
    }
}
