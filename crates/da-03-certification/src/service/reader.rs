//! # Chain-Validating Reader
//!
//! Returns a payload only after its certificate checks out against the
//! committee the chain reports at the certificate's height.
//!
//! ```text
//! retrieve(cert) ─▶ expiry ─▶ committee (cache | chain) ─▶ mask + quorum
//!                ─▶ aggregate signature ─▶ inner.get ─▶ content check
//! ```
//!
//! Storage success never substitutes for validation: any failed check is
//! `CertificateInvalid` even when the bytes are available. A chain that
//! cannot answer yields `Timeout` or `TransientIo` instead, so the caller
//! may retry; the payload is not read in either case.

use crate::config::ValidationSettings;
use crate::domain::{check_expiry, check_signature, check_signers, CommitteeCache};
use async_trait::async_trait;
use shared_types::{
    verify_content, Certificate, ChainReader, CommitteeInfo, DaError, DaReader, DataHash,
    ExpirationPolicy, RetrieveKey, TimeSource,
};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ChainValidatingReader {
    inner: Arc<dyn DaReader>,
    chain: Arc<dyn ChainReader>,
    settings: ValidationSettings,
    committees: CommitteeCache,
    clock: Arc<dyn TimeSource>,
}

impl ChainValidatingReader {
    pub fn new(
        inner: Arc<dyn DaReader>,
        chain: Arc<dyn ChainReader>,
        settings: ValidationSettings,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let committees = CommitteeCache::new(settings.committee_cache_size);
        Self {
            inner,
            chain,
            settings,
            committees,
            clock,
        }
    }

    pub fn settings(&self) -> &ValidationSettings {
        &self.settings
    }

    /// Fetch a payload by certificate or, when allowed, by bare hash.
    pub async fn retrieve(&self, key: RetrieveKey) -> Result<Vec<u8>, DaError> {
        match key {
            RetrieveKey::Certificate(cert) => self.retrieve_certified(&cert).await,
            RetrieveKey::Hash(hash) => {
                if !self.settings.allow_hash_reads {
                    return Err(DaError::invalid_certificate(
                        "certificate required: hash reads are disabled",
                    ));
                }
                self.read_checked(&hash).await
            }
        }
    }

    /// Run every certificate check without reading the payload.
    pub async fn validate(&self, cert: &Certificate) -> Result<(), DaError> {
        check_expiry(cert, self.clock.now())?;
        let committee = self.committee(cert.committee_height).await?;
        check_signers(cert, &committee, self.settings.quorum_threshold)?;
        check_signature(cert, &committee)
    }

    async fn retrieve_certified(&self, cert: &Certificate) -> Result<Vec<u8>, DaError> {
        if let Err(e) = self.validate(cert).await {
            warn!(hash = %cert.data_hash, error = %e, "[da-03] certificate rejected");
            return Err(e);
        }
        self.read_checked(&cert.data_hash).await
    }

    async fn read_checked(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        let data = self.inner.get_by_hash(hash).await?;
        verify_content(hash, &data)?;
        Ok(data)
    }

    async fn committee(&self, height: u64) -> Result<CommitteeInfo, DaError> {
        if let Some(committee) = self.committees.get(height) {
            return Ok(committee);
        }

        let timeout = self.settings.chain_timeout;
        let committee = tokio::time::timeout(timeout, self.chain.committee_at(height))
            .await
            .map_err(|_| DaError::Timeout {
                operation: format!("committee lookup at height {}", height),
                millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(|e| match e {
                DaError::CertificateInvalid { .. } => e,
                e if e.is_transient() => e,
                other => DaError::invalid_certificate(format!(
                    "committee at height {} unavailable: {}",
                    height, other
                )),
            })?;

        debug!(height, members = committee.members.len(), "[da-03] committee cached");
        self.committees.insert(height, committee.clone());
        Ok(committee)
    }
}

#[async_trait]
impl DaReader for ChainValidatingReader {
    /// Bare-hash reads follow `allow_hash_reads`.
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        self.retrieve(RetrieveKey::Hash(*hash)).await
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        self.inner.expiration_policy().await
    }

    async fn health_check(&self) -> Result<(), DaError> {
        self.inner.health_check().await
    }

    fn name(&self) -> String {
        format!("chain-validating({})", self.inner.name())
    }
}
