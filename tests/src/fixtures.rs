//! # Test Fixtures
//!
//! Deterministic committees, certificate construction and in-process
//! committee members standing in for remote signers and readers.

use async_trait::async_trait;
use da_01_storage::InMemoryStorageService;
use da_02_rest_aggregator::{RemoteSigner, SignerEndpoint, SignerResponse};
use shared_crypto::{aggregate_signatures, BlsKeyPair};
use shared_types::{
    Certificate, CommitteeInfo, DaError, DaReader, DataHash, StorageService, Timestamp,
};
use std::sync::Arc;
use std::time::Duration;

/// A committee whose secret keys the test holds.
pub struct Committee {
    pub keys: Vec<BlsKeyPair>,
    pub info: CommitteeInfo,
}

impl Committee {
    /// `size` members derived from fixed seeds, active from `height`.
    pub fn new(size: usize, quorum: usize, height: u64) -> Self {
        let keys: Vec<BlsKeyPair> = (0..size)
            .map(|i| BlsKeyPair::from_seed(&[i as u8 + 1; 32]).unwrap())
            .collect();
        let members = keys.iter().map(|k| k.public_key().to_bytes()).collect();
        Self {
            keys,
            info: CommitteeInfo {
                height,
                members,
                quorum,
            },
        }
    }

    /// Hex secret of member `index`, as it appears in configuration.
    pub fn secret_hex(&self, index: usize) -> String {
        hex::encode(self.keys[index].secret_bytes().as_bytes())
    }

    pub fn public_hex(&self, index: usize) -> String {
        hex::encode(self.keys[index].public_key().to_bytes())
    }

    /// Certificate over `data` signed by `signers`, with any mask bits
    /// in `extra_mask` claimed on top.
    pub fn certify(
        &self,
        data: &[u8],
        expiration: Timestamp,
        signers: &[usize],
        extra_mask: u64,
    ) -> Certificate {
        let data_hash = DataHash::of(data);
        let message = Certificate::signable_message(&data_hash, expiration);
        let partials: Vec<[u8; 96]> = signers
            .iter()
            .map(|&i| self.keys[i].sign(&message).to_bytes())
            .collect();
        let signers_mask = signers.iter().fold(extra_mask, |m, &i| m | (1u64 << i));
        Certificate {
            data_hash,
            expiration,
            committee_height: self.info.height,
            signers_mask,
            signature: aggregate_signatures(&partials).unwrap(),
        }
    }
}

/// How an in-process committee member answers store requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerBehavior {
    Honest,
    Fail,
    /// Signs a later expiration than requested.
    ShiftExpiration(u64),
    /// Answers honestly after a pause.
    Delayed(u64),
}

/// Committee member that stores into its own memory backend and signs.
pub struct LocalSigner {
    pub index: u32,
    keys: BlsKeyPair,
    behavior: SignerBehavior,
    pub storage: Arc<InMemoryStorageService>,
}

impl LocalSigner {
    pub fn new(committee: &Committee, index: usize, behavior: SignerBehavior) -> Self {
        let keys = BlsKeyPair::from_secret(&committee.keys[index].secret_bytes()).unwrap();
        Self {
            index: index as u32,
            keys,
            behavior,
            storage: Arc::new(InMemoryStorageService::new(format!("member-{}", index))),
        }
    }

    pub fn endpoint_for(self: &Arc<Self>, committee: &Committee) -> SignerEndpoint {
        SignerEndpoint {
            index: self.index as usize,
            public_key: committee.keys[self.index as usize].public_key().to_bytes(),
            signer: self.clone(),
        }
    }
}

#[async_trait]
impl RemoteSigner for LocalSigner {
    async fn store(&self, data: &[u8], expiration: Timestamp) -> Result<SignerResponse, DaError> {
        let expiration = match self.behavior {
            SignerBehavior::Fail => return Err(DaError::transient(self.endpoint(), "refused")),
            SignerBehavior::ShiftExpiration(by) => expiration + by,
            SignerBehavior::Delayed(ms) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                expiration
            }
            SignerBehavior::Honest => expiration,
        };
        self.storage.put(data, expiration).await?;
        let data_hash = DataHash::of(data);
        let message = Certificate::signable_message(&data_hash, expiration);
        Ok(SignerResponse {
            data_hash,
            expiration,
            signature: self.keys.sign(&message).to_bytes(),
            signer: self.index,
        })
    }

    fn endpoint(&self) -> String {
        format!("local://member-{}", self.index)
    }
}

/// Members' storages as remote readers.
pub fn readers_of(signers: &[Arc<LocalSigner>]) -> Vec<Arc<dyn DaReader>> {
    signers
        .iter()
        .map(|s| s.storage.clone() as Arc<dyn DaReader>)
        .collect()
}

/// Members as remote signers, in committee order.
pub fn signers_of(signers: &[Arc<LocalSigner>]) -> Vec<Arc<dyn RemoteSigner>> {
    signers
        .iter()
        .map(|s| s.clone() as Arc<dyn RemoteSigner>)
        .collect()
}
