//! Errors raised by key handling, signing and certificate verification.

use thiserror::Error;

/// Why a key, signature or aggregate was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("wrong key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("secret key is not a valid BLS12-381 scalar")]
    InvalidPrivateKey,

    /// Not a compressed G1 point, or not in the prime-order subgroup.
    #[error("malformed BLS public key")]
    InvalidPublicKey,

    /// Not a compressed G2 point, or not in the prime-order subgroup.
    #[error("malformed BLS signature")]
    InvalidSignature,

    #[error("key derivation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("nothing to aggregate: {0} list is empty")]
    EmptyAggregate(&'static str),

    #[error("aggregation rejected an input point")]
    AggregationFailed,

    /// Signer mask with no bits set.
    #[error("certificate names no signers")]
    EmptySignerSet,

    #[error("signer bit {index} is outside a committee of {size}")]
    SignerOutsideCommittee { index: usize, size: usize },

    #[error("signature does not verify")]
    SignatureVerificationFailed,
}
