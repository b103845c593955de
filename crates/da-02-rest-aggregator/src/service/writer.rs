//! # Quorum Store Aggregator
//!
//! Sends a payload to every committee signer and combines the partial
//! signatures of the first `(hash, expiration)` group that reaches quorum
//! into a `Certificate`.
//!
//! A response is counted only when its signature verifies under the public
//! key configured for that endpoint and its reported index matches. Two
//! distinct groups reaching quorum in one round rejects the round.

use crate::config::StoreAggregatorSettings;
use crate::domain::QuorumTally;
use crate::ports::{SignerEndpoint, SignerResponse};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use shared_crypto::{aggregate_signatures, verify_signature};
use shared_types::{
    BlsSignatureBytes, Certificate, ChainReader, DaError, DaWriter, DataHash, Timestamp,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum committee size addressable by the signer bitmask.
pub const MAX_SIGNERS: usize = 64;

pub struct QuorumStoreAggregator {
    signers: Vec<SignerEndpoint>,
    settings: StoreAggregatorSettings,
    chain: Option<Arc<dyn ChainReader>>,
}

impl QuorumStoreAggregator {
    pub fn new(
        signers: Vec<SignerEndpoint>,
        settings: StoreAggregatorSettings,
        chain: Option<Arc<dyn ChainReader>>,
    ) -> Result<Self, DaError> {
        if signers.is_empty() {
            return Err(DaError::Configuration(
                "store aggregator needs at least one signer".into(),
            ));
        }
        if settings.quorum == 0 || settings.quorum > signers.len() {
            return Err(DaError::Configuration(format!(
                "signing quorum {} must be between 1 and {} signers",
                settings.quorum,
                signers.len()
            )));
        }
        if settings.timeout.is_zero() {
            return Err(DaError::Configuration(
                "store aggregator timeout must be non-zero".into(),
            ));
        }
        let mut seen = HashSet::new();
        for signer in &signers {
            if signer.index >= MAX_SIGNERS {
                return Err(DaError::Configuration(format!(
                    "signer index {} exceeds {}",
                    signer.index,
                    MAX_SIGNERS - 1
                )));
            }
            if !seen.insert(signer.index) {
                return Err(DaError::Configuration(format!(
                    "duplicate signer index {}",
                    signer.index
                )));
            }
        }

        Ok(Self {
            signers,
            settings,
            chain,
        })
    }

    pub fn quorum(&self) -> usize {
        self.settings.quorum
    }

    async fn committee_height(&self) -> u64 {
        let Some(chain) = &self.chain else {
            return self.settings.committee_height;
        };
        match chain.latest_confirmed_batch_height().await {
            Ok(height) => height,
            Err(e) => {
                warn!(error = %e, "[da-02] chain height unavailable, using configured committee height");
                self.settings.committee_height
            }
        }
    }

    /// Accept a response only if it is well-formed for this endpoint.
    fn check_response(
        endpoint: &SignerEndpoint,
        response: &SignerResponse,
    ) -> Result<(), DaError> {
        if usize::try_from(response.signer).ok() != Some(endpoint.index) {
            return Err(DaError::invalid_certificate(format!(
                "{} reported index {}, expected {}",
                endpoint.signer.endpoint(),
                response.signer,
                endpoint.index
            )));
        }
        let message = Certificate::signable_message(&response.data_hash, response.expiration);
        verify_signature(&endpoint.public_key, &message, &response.signature).map_err(|e| {
            DaError::invalid_certificate(format!("{}: {}", endpoint.signer.endpoint(), e))
        })
    }

    fn certificate(
        &self,
        data_hash: DataHash,
        expiration: Timestamp,
        committee_height: u64,
        members: &[(usize, BlsSignatureBytes)],
    ) -> Result<Certificate, DaError> {
        let signatures: Vec<BlsSignatureBytes> = members.iter().map(|(_, s)| *s).collect();
        let signature = aggregate_signatures(&signatures)
            .map_err(|e| DaError::quorum(format!("aggregation failed: {}", e)))?;
        let signers_mask = members.iter().fold(0u64, |mask, (i, _)| mask | (1u64 << i));
        Ok(Certificate {
            data_hash,
            expiration,
            committee_height,
            signers_mask,
            signature,
        })
    }
}

#[async_trait]
impl DaWriter for QuorumStoreAggregator {
    async fn store(&self, data: &[u8], expiration: Timestamp) -> Result<Certificate, DaError> {
        let quorum = self.settings.quorum;
        let wanted = (DataHash::of(data), expiration);
        let committee_height = self.committee_height().await;

        let mut pending: FuturesUnordered<_> = self
            .signers
            .iter()
            .map(|endpoint| async move { (endpoint, endpoint.signer.store(data, expiration).await) })
            .collect();

        let mut tally: QuorumTally<(DataHash, Timestamp), (usize, BlsSignatureBytes)> =
            QuorumTally::new(quorum);
        let mut excluded = 0usize;
        let mut outstanding = self.signers.len();

        let deadline = tokio::time::sleep(self.settings.timeout);
        tokio::pin!(deadline);

        loop {
            let (endpoint, result) = tokio::select! {
                _ = &mut deadline => {
                    return Err(DaError::quorum(format!(
                        "timed out after {}ms with {} of {} matching signatures",
                        self.settings.timeout.as_millis(),
                        tally.count(&wanted),
                        quorum
                    )));
                }
                next = pending.next() => match next {
                    Some(item) => item,
                    None => break,
                },
            };
            outstanding -= 1;

            let response = match result.and_then(|r| Self::check_response(endpoint, &r).map(|_| r)) {
                Ok(response) => response,
                Err(e) => {
                    excluded += 1;
                    warn!(endpoint = %endpoint.signer.endpoint(), error = %e, "[da-02] signer excluded");
                    if tally.unreachable(outstanding) {
                        break;
                    }
                    continue;
                }
            };

            let key = (response.data_hash, response.expiration);
            if key != wanted {
                debug!(
                    endpoint = %endpoint.signer.endpoint(),
                    hash = %response.data_hash,
                    expiration = response.expiration,
                    "[da-02] signer attested different content"
                );
            }
            tally.add(key, (endpoint.index, response.signature));

            let quorums = tally.quorum_keys();
            if quorums.len() > 1 {
                return Err(DaError::quorum(
                    "conflicting quorums for different (hash, expiration) in one round",
                ));
            }
            if tally.reached(&wanted) {
                let cert = self.certificate(
                    wanted.0,
                    expiration,
                    committee_height,
                    tally.members(&wanted),
                )?;
                info!(
                    hash = %cert.data_hash,
                    signers = cert.signer_count(),
                    "[da-02] certificate aggregated"
                );
                return Ok(cert);
            }
            if tally.unreachable(outstanding) {
                break;
            }
        }

        Err(DaError::quorum(format!(
            "{} of {} matching signatures, {} signers excluded",
            tally.count(&wanted),
            quorum,
            excluded
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RemoteSigner;
    use shared_crypto::{verify_aggregate, BlsKeyPair};
    use shared_types::InMemoryChain;
    use std::time::Duration;

    enum Behavior {
        Honest,
        Fail,
        BadSignature,
        WrongHash,
        Hang,
        Delayed(u64),
    }

    struct MockSigner {
        index: u32,
        keys: BlsKeyPair,
        behavior: Behavior,
    }

    #[async_trait]
    impl RemoteSigner for MockSigner {
        async fn store(
            &self,
            data: &[u8],
            expiration: Timestamp,
        ) -> Result<SignerResponse, DaError> {
            let mut data_hash = DataHash::of(data);
            match self.behavior {
                Behavior::Fail => return Err(DaError::transient(self.endpoint(), "down")),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }
                Behavior::Delayed(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                Behavior::WrongHash => data_hash = DataHash::of(b"other"),
                _ => {}
            }
            let mut message = Certificate::signable_message(&data_hash, expiration);
            if matches!(self.behavior, Behavior::BadSignature) {
                message.push(0);
            }
            Ok(SignerResponse {
                data_hash,
                expiration,
                signature: self.keys.sign(&message).to_bytes(),
                signer: self.index,
            })
        }

        fn endpoint(&self) -> String {
            format!("mock-{}", self.index)
        }
    }

    fn committee(behaviors: Vec<Behavior>) -> (Vec<SignerEndpoint>, Vec<[u8; 48]>) {
        let mut endpoints = Vec::new();
        let mut keys = Vec::new();
        for (i, behavior) in behaviors.into_iter().enumerate() {
            let pair = BlsKeyPair::from_seed(&[i as u8 + 1; 32]).unwrap();
            let public_key = pair.public_key().to_bytes();
            keys.push(public_key);
            endpoints.push(SignerEndpoint {
                index: i,
                public_key,
                signer: Arc::new(MockSigner {
                    index: i as u32,
                    keys: pair,
                    behavior,
                }),
            });
        }
        (endpoints, keys)
    }

    fn settings(quorum: usize) -> StoreAggregatorSettings {
        StoreAggregatorSettings {
            quorum,
            timeout: Duration::from_millis(200),
            committee_height: 7,
        }
    }

    #[tokio::test]
    async fn test_aggregates_quorum_of_valid_signatures() {
        let (signers, keys) = committee(vec![Behavior::Honest, Behavior::Fail, Behavior::Honest]);
        let agg = QuorumStoreAggregator::new(signers, settings(2), None).unwrap();

        let cert = agg.store(b"batch", 1_000).await.unwrap();
        assert_eq!(cert.data_hash, DataHash::of(b"batch"));
        assert_eq!(cert.signers_mask, 0b101);
        assert_eq!(cert.committee_height, 7);
        verify_aggregate(&keys, cert.signers_mask, &cert.message(), &cert.signature).unwrap();
    }

    #[tokio::test]
    async fn test_bad_signatures_excluded() {
        let (signers, _) = committee(vec![
            Behavior::BadSignature,
            Behavior::Honest,
            Behavior::Honest,
        ]);
        let agg = QuorumStoreAggregator::new(signers, settings(2), None).unwrap();
        let cert = agg.store(b"batch", 1_000).await.unwrap();
        assert_eq!(cert.signers_mask, 0b110);
    }

    #[tokio::test]
    async fn test_insufficient_valid_signatures() {
        let (signers, _) = committee(vec![Behavior::Honest, Behavior::Fail, Behavior::WrongHash]);
        let agg = QuorumStoreAggregator::new(signers, settings(2), None).unwrap();
        let err = agg.store(b"batch", 1_000).await.unwrap_err();
        assert!(matches!(err, DaError::QuorumNotReached { .. }));
    }

    #[tokio::test]
    async fn test_global_timeout() {
        let (signers, _) = committee(vec![Behavior::Honest, Behavior::Hang]);
        let agg = QuorumStoreAggregator::new(signers, settings(2), None).unwrap();
        let err = agg.store(b"batch", 1_000).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_conflicting_quorums_reject_round() {
        let (signers, _) = committee(vec![Behavior::WrongHash, Behavior::Delayed(20)]);
        let agg = QuorumStoreAggregator::new(signers, settings(1), None).unwrap();
        let err = agg.store(b"batch", 1_000).await.unwrap_err();
        assert!(err.to_string().contains("conflicting"));
    }

    #[tokio::test]
    async fn test_committee_height_from_chain() {
        let chain = Arc::new(InMemoryChain::new());
        chain.set_latest_height(42);
        let (signers, _) = committee(vec![Behavior::Honest]);
        let agg = QuorumStoreAggregator::new(
            signers,
            settings(1),
            Some(chain as Arc<dyn ChainReader>),
        )
        .unwrap();
        assert_eq!(agg.store(b"x", 5).await.unwrap().committee_height, 42);
    }

    #[test]
    fn test_configuration_checks() {
        let (signers, _) = committee(vec![Behavior::Honest, Behavior::Honest]);
        assert!(QuorumStoreAggregator::new(signers.clone(), settings(3), None).is_err());

        let mut dup = signers.clone();
        dup[1].index = 0;
        assert!(QuorumStoreAggregator::new(dup, settings(1), None).is_err());

        let mut wide = signers;
        wide[0].index = 64;
        assert!(QuorumStoreAggregator::new(wide, settings(1), None).is_err());
    }
}
