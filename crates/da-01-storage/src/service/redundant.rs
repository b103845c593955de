//! # Redundant Storage Aggregator
//!
//! Fan-out writer and ordered fan-in reader over several backends.
//!
//! - `put`: concurrent to every backend; succeeds only when all succeed.
//!   No rollback of the replicas that did succeed.
//! - `get`: backends tried one at a time in preference order; first valid
//!   hit wins. A content mismatch stops the search.

use async_trait::async_trait;
use futures::future::join_all;
use shared_types::{
    verify_content, DaError, DaReader, DataHash, ExpirationPolicy, StorageCapabilities,
    StorageService, Timestamp,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fan-out/fan-in aggregator over N storage backends.
pub struct RedundantStorageService {
    backends: Vec<Arc<dyn StorageService>>,
}

impl RedundantStorageService {
    /// Backends are listed in read preference order.
    pub fn new(backends: Vec<Arc<dyn StorageService>>) -> Result<Self, DaError> {
        if backends.is_empty() {
            return Err(DaError::Configuration(
                "redundant storage needs at least one backend".into(),
            ));
        }
        Ok(Self { backends })
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }
}

/// Keep the more informative of two errors; ties keep the earlier one.
fn most_informative(current: Option<DaError>, candidate: DaError) -> DaError {
    match current {
        Some(cur) if cur.severity() >= candidate.severity() => cur,
        _ => candidate,
    }
}

#[async_trait]
impl DaReader for RedundantStorageService {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        let mut best: Option<DaError> = None;
        for backend in &self.backends {
            match backend.get_by_hash(hash).await {
                Ok(data) => {
                    verify_content(hash, &data)?;
                    return Ok(data);
                }
                Err(e) if e.is_integrity_failure() => return Err(e),
                Err(e) => {
                    if !e.is_not_found() {
                        warn!(backend = %backend.name(), %hash, error = %e, "[da-01] redundant read failed");
                    }
                    best = Some(most_informative(best, e));
                }
            }
        }
        Err(best.unwrap_or(DaError::NotFound { hash: *hash }))
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        let policies = join_all(self.backends.iter().map(|b| b.expiration_policy())).await;
        let mut agreed: Option<ExpirationPolicy> = None;
        for policy in policies {
            let policy = policy?;
            match agreed {
                None => agreed = Some(policy),
                Some(p) if p == policy => {}
                Some(p) => {
                    return Err(DaError::Configuration(format!(
                        "redundant backends disagree on expiration policy: {:?} vs {:?}",
                        p, policy
                    )))
                }
            }
        }
        agreed.ok_or_else(|| DaError::Configuration("no backends".into()))
    }

    async fn health_check(&self) -> Result<(), DaError> {
        let results = join_all(self.backends.iter().map(|b| b.health_check())).await;
        results.into_iter().collect()
    }

    fn name(&self) -> String {
        let names: Vec<String> = self.backends.iter().map(|b| b.name()).collect();
        format!("redundant[{}]", names.join(","))
    }
}

#[async_trait]
impl StorageService for RedundantStorageService {
    async fn put(&self, data: &[u8], expiration: Timestamp) -> Result<(), DaError> {
        let results = join_all(self.backends.iter().map(|b| b.put(data, expiration))).await;

        let mut first_error = None;
        for (backend, result) in self.backends.iter().zip(results) {
            if let Err(e) = result {
                warn!(backend = %backend.name(), error = %e, "[da-01] redundant write failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                debug!(replicas = self.backends.len(), "[da-01] redundant write complete");
                Ok(())
            }
        }
    }

    async fn sync(&self) -> Result<(), DaError> {
        let results = join_all(self.backends.iter().map(|b| b.sync())).await;
        results.into_iter().collect()
    }

    fn capabilities(&self) -> StorageCapabilities {
        StorageCapabilities {
            persistent: self.backends.iter().any(|b| b.capabilities().persistent),
            enumerable: false,
            single_key_only: self.backends.iter().all(|b| b.capabilities().single_key_only),
        }
    }
}
