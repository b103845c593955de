//! # Remote Signer Port
//!
//! A committee member that persists a payload and returns its partial
//! signature over `(data_hash, expiration)`.

use async_trait::async_trait;
use shared_types::{BlsPublicKeyBytes, BlsSignatureBytes, DaError, DataHash, Timestamp};
use std::sync::Arc;

/// One member's answer to a store request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerResponse {
    /// Hash the member claims to have stored.
    pub data_hash: DataHash,
    /// Expiration the member claims to honor.
    pub expiration: Timestamp,
    /// Partial BLS signature over `signable_message(data_hash, expiration)`.
    pub signature: BlsSignatureBytes,
    /// Committee index reported by the member.
    pub signer: u32,
}

/// Asks one committee member to store and sign.
#[async_trait]
pub trait RemoteSigner: Send + Sync {
    async fn store(&self, data: &[u8], expiration: Timestamp) -> Result<SignerResponse, DaError>;

    /// Endpoint label for logs.
    fn endpoint(&self) -> String;
}

/// A signer bound to its committee position and expected key.
#[derive(Clone)]
pub struct SignerEndpoint {
    pub index: usize,
    pub public_key: BlsPublicKeyBytes,
    pub signer: Arc<dyn RemoteSigner>,
}

impl std::fmt::Debug for SignerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerEndpoint")
            .field("index", &self.index)
            .field("public_key", &hex::encode(self.public_key))
            .field("endpoint", &self.signer.endpoint())
            .finish()
    }
}
