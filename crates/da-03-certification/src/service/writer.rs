//! # Certifying Writer
//!
//! Persists a payload through the wrapped store, then signs
//! `(hash, expiration)` with the local committee key.
//!
//! With chain authorization enabled the local key must be the committee
//! member at the configured index at the latest confirmed height; otherwise
//! the write is rejected before anything is stored or signed.

use crate::config::CertifyingWriterSettings;
use async_trait::async_trait;
use shared_crypto::BlsKeyPair;
use shared_types::{
    Certificate, ChainReader, DaError, DaReader, DaWriter, DataHash, ExpirationPolicy,
    StorageService, Timestamp,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct CertifyingWriter {
    store: Arc<dyn StorageService>,
    keys: BlsKeyPair,
    settings: CertifyingWriterSettings,
    chain: Option<Arc<dyn ChainReader>>,
}

impl CertifyingWriter {
    /// Fails with `Configuration` when authorization is required but no
    /// chain reader is available, or the index does not fit the signer mask.
    pub fn new(
        store: Arc<dyn StorageService>,
        keys: BlsKeyPair,
        settings: CertifyingWriterSettings,
        chain: Option<Arc<dyn ChainReader>>,
    ) -> Result<Self, DaError> {
        if settings.signer_index >= 64 {
            return Err(DaError::Configuration(format!(
                "signer index {} does not fit a 64-bit signer mask",
                settings.signer_index
            )));
        }
        if settings.require_chain_authorization && chain.is_none() {
            return Err(DaError::Configuration(
                "chain authorization requires a chain reader".into(),
            ));
        }
        info!(
            signer_index = settings.signer_index,
            store = %store.name(),
            authorize = settings.require_chain_authorization,
            "[da-03] certifying writer ready"
        );
        Ok(Self {
            store,
            keys,
            settings,
            chain,
        })
    }

    pub fn public_key(&self) -> [u8; 48] {
        self.keys.public_key().to_bytes()
    }

    /// Returns the height the local key is authorized at.
    async fn authorize(&self, chain: &dyn ChainReader) -> Result<u64, DaError> {
        let timeout = self.settings.chain_timeout;
        let height = bounded(
            timeout,
            "latest confirmed height",
            chain.latest_confirmed_batch_height(),
        )
        .await?;
        let committee = bounded(timeout, "committee lookup", chain.committee_at(height)).await?;

        let local = self.public_key();
        match committee.members.get(self.settings.signer_index) {
            Some(member) if *member == local => Ok(height),
            _ => Err(DaError::invalid_certificate(format!(
                "local key is not committee member {} at height {}",
                self.settings.signer_index, height
            ))),
        }
    }
}

async fn bounded<T>(
    timeout: Duration,
    operation: &str,
    fut: impl std::future::Future<Output = Result<T, DaError>>,
) -> Result<T, DaError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| DaError::Timeout {
            operation: operation.to_string(),
            millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })?
}

#[async_trait]
impl DaWriter for CertifyingWriter {
    async fn store(&self, data: &[u8], expiration: Timestamp) -> Result<Certificate, DaError> {
        let committee_height = match (&self.chain, self.settings.require_chain_authorization) {
            (Some(chain), true) => self.authorize(chain.as_ref()).await.map_err(|e| {
                warn!(error = %e, "[da-03] write rejected: signer not authorized");
                match e {
                    DaError::CertificateInvalid { .. } => e,
                    other => DaError::invalid_certificate(format!("authorization check: {}", other)),
                }
            })?,
            (Some(chain), false) => bounded(
                self.settings.chain_timeout,
                "latest confirmed height",
                chain.latest_confirmed_batch_height(),
            )
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "[da-03] chain height unavailable, stamping height 0");
                0
            }),
            (None, _) => 0,
        };

        self.store.put(data, expiration).await?;

        let data_hash = DataHash::of(data);
        let message = Certificate::signable_message(&data_hash, expiration);
        let signature = self.keys.sign(&message).to_bytes();
        debug!(%data_hash, expiration, "[da-03] payload stored and signed");

        Ok(Certificate {
            data_hash,
            expiration,
            committee_height,
            signers_mask: 1u64 << self.settings.signer_index,
            signature,
        })
    }
}

#[async_trait]
impl DaReader for CertifyingWriter {
    async fn get_by_hash(&self, hash: &DataHash) -> Result<Vec<u8>, DaError> {
        self.store.get_by_hash(hash).await
    }

    async fn expiration_policy(&self) -> Result<ExpirationPolicy, DaError> {
        self.store.expiration_policy().await
    }

    async fn health_check(&self) -> Result<(), DaError> {
        self.store.health_check().await
    }

    fn name(&self) -> String {
        format!("certifying({})", self.store.name())
    }
}

impl std::fmt::Debug for CertifyingWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertifyingWriter")
            .field("store", &self.store.name())
            .field("signer_index", &self.settings.signer_index)
            .finish()
    }
}
