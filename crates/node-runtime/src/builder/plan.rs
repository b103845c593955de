//! # Composition Plan
//!
//! Pure translation of a validated configuration into the ordered list of
//! graph layers to build, leaves first. No I/O happens here.

use crate::container::{
    BackendConfig, CacheKind, ConfigError, DataAvailabilityConfig, NodeRole,
};
use std::fmt;

/// One layer of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    /// Leaf store; `iterable` when it feeds replication.
    Backend { config: BackendConfig, iterable: bool },
    /// Fan-out over every backend built so far.
    Redundant { members: Vec<String> },
    /// Empty store standing in when the graph has no local backend.
    EmptyStorage,
    /// Background copy between backends.
    Replication {
        sources: Vec<String>,
        destinations: Vec<String>,
    },
    /// Quorum reader over remote members.
    RestAggregator { endpoints: usize, quorum: usize },
    /// Local primary with the REST aggregator as backup.
    Fallback { eager: bool },
    /// Store, then sign with the local key.
    CertifyingWriter { signer_index: usize, authorize: bool },
    /// Remote partial-signature collection.
    StoreAggregator { signers: usize, quorum: usize },
    /// Cache in front of the stack built so far.
    Cache { kind: CacheKind },
    /// Certificate checks against the chain.
    ChainValidation { quorum: usize },
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { config, iterable } => write!(
                f,
                "backend {} ({:?}{})",
                config.name,
                config.kind,
                if *iterable { ", iterable" } else { "" }
            ),
            Self::Redundant { members } => write!(f, "redundant [{}]", members.join(", ")),
            Self::EmptyStorage => write!(f, "empty storage"),
            Self::Replication {
                sources,
                destinations,
            } => write!(
                f,
                "replication [{}] -> [{}]",
                sources.join(", "),
                destinations.join(", ")
            ),
            Self::RestAggregator { endpoints, quorum } => {
                write!(f, "rest aggregator {}/{}", quorum, endpoints)
            }
            Self::Fallback { eager } => {
                write!(f, "fallback ({})", if *eager { "eager" } else { "passive" })
            }
            Self::CertifyingWriter {
                signer_index,
                authorize,
            } => write!(
                f,
                "certifying writer #{}{}",
                signer_index,
                if *authorize { " (chain-authorized)" } else { "" }
            ),
            Self::StoreAggregator { signers, quorum } => {
                write!(f, "store aggregator {}/{}", quorum, signers)
            }
            Self::Cache { kind } => write!(f, "cache ({:?})", kind),
            Self::ChainValidation { quorum } => write!(f, "chain validation (quorum {})", quorum),
        }
    }
}

/// Ordered layers for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionPlan {
    pub role: NodeRole,
    pub steps: Vec<PlanStep>,
}

impl CompositionPlan {
    pub fn contains(&self, predicate: impl Fn(&PlanStep) -> bool) -> bool {
        self.steps.iter().any(predicate)
    }

    /// Human-readable layer list, leaves first.
    pub fn describe(&self) -> Vec<String> {
        self.steps.iter().map(ToString::to_string).collect()
    }
}

/// Validate `config` and lay out its graph. `None` when DA is disabled.
pub fn plan(config: &DataAvailabilityConfig) -> Result<Option<CompositionPlan>, ConfigError> {
    if !config.enable {
        return Ok(None);
    }
    config.validate()?;

    let replicate = config.replication.enable;
    let mut steps = Vec::new();

    let backends: Vec<&BackendConfig> = config.enabled_backends().collect();
    for backend in &backends {
        steps.push(PlanStep::Backend {
            config: (*backend).clone(),
            iterable: replicate && backend.sync_from,
        });
    }
    if backends.len() > 1 {
        steps.push(PlanStep::Redundant {
            members: backends.iter().map(|b| b.name.clone()).collect(),
        });
    }
    if replicate {
        steps.push(PlanStep::Replication {
            sources: names(&backends, |b| b.sync_from),
            destinations: names(&backends, |b| b.sync_to),
        });
    }

    if config.rest_aggregator.enable {
        steps.push(PlanStep::RestAggregator {
            endpoints: config.rest_aggregator.urls.len(),
            quorum: config.rest_aggregator.quorum_threshold,
        });
    }
    if config.fallback.enable {
        steps.push(PlanStep::Fallback {
            eager: config.fallback.eager,
        });
    }
    if backends.is_empty() && !config.rest_aggregator.enable {
        steps.push(PlanStep::EmptyStorage);
    }

    match config.role {
        NodeRole::Server => {
            if config.signing.key_material.is_some() {
                steps.push(PlanStep::CertifyingWriter {
                    signer_index: config.signing.signer_index,
                    authorize: config.signing.require_chain_authorization,
                });
            }
        }
        NodeRole::BatchPoster => {
            steps.push(PlanStep::StoreAggregator {
                signers: config.store_aggregator.signers.len(),
                quorum: config.store_aggregator.quorum_threshold,
            });
        }
        NodeRole::Node => {}
    }

    if config.cache.enable {
        steps.push(PlanStep::Cache {
            kind: config.cache.kind,
        });
    }
    if config.validation.enable {
        steps.push(PlanStep::ChainValidation {
            quorum: config.validation.quorum_threshold,
        });
    }

    Ok(Some(CompositionPlan {
        role: config.role,
        steps,
    }))
}

fn names(backends: &[&BackendConfig], pick: impl Fn(&BackendConfig) -> bool) -> Vec<String> {
    backends
        .iter()
        .filter(|b| pick(b))
        .map(|b| b.name.clone())
        .collect()
}
