//! BLS12-381 Signature Implementation
//!
//! Provides BLS signature primitives for:
//! - Deterministic key derivation and loading from configured hex
//! - Sign/verify operations
//! - Partial signature aggregation
//! - Verification of an aggregate signature against a committee subset
//!
//! Used by the certifying writer, the quorum store aggregator and the
//! chain-validating reader.

use blst::min_pk::{AggregateSignature, PublicKey, SecretKey, Signature};
use blst::BLST_ERROR;
use zeroize::Zeroize;

use crate::CryptoError;

/// Proof-of-possession ciphersuite tag shared by every committee member.
const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Committees addressable by a `u64` signer mask.
const MAX_MASK_MEMBERS: usize = 64;

/// BLS secret key material (32 bytes), wiped on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct BlsSecretKey([u8; 32]);

impl BlsSecretKey {
    /// Wrap 32 bytes of secret scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(*bytes)
    }

    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = hex::decode(s).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let result = <[u8; 32]>::try_from(bytes.as_slice())
            .map(Self)
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            });
        bytes.zeroize();
        result
    }

    /// Secret scalar bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Committee member key on G1, 48 bytes compressed.
#[derive(Clone, Debug)]
pub struct BlsPublicKey(PublicKey);

impl PartialEq for BlsPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsPublicKey {}

/// Partial or aggregate signature on G2, 96 bytes compressed.
#[derive(Clone, Debug)]
pub struct BlsSignature(Signature);

impl PartialEq for BlsSignature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsSignature {}

/// Local signing identity of a committee member.
pub struct BlsKeyPair {
    secret: SecretKey,
    public: BlsPublicKey,
}

impl BlsKeyPair {
    /// Derive a key pair deterministically from 32 bytes of input key material.
    pub fn from_seed(ikm: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = SecretKey::key_gen(ikm, &[])
            .map_err(|e| CryptoError::KeyGenerationFailed(format!("{:?}", e)))?;
        let public = BlsPublicKey(secret.sk_to_pk());
        Ok(Self { secret, public })
    }

    /// Rebuild from a serialized secret scalar.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let public = BlsPublicKey(secret.sk_to_pk());
        Ok(Self { secret, public })
    }

    /// Load from configured secret key material.
    pub fn from_secret(secret: &BlsSecretKey) -> Result<Self, CryptoError> {
        Self::from_secret_bytes(secret.as_bytes())
    }

    /// Partial signature over `message`.
    pub fn sign(&self, message: &[u8]) -> BlsSignature {
        BlsSignature(self.secret.sign(message, DST, &[]))
    }

    pub fn public_key(&self) -> BlsPublicKey {
        self.public.clone()
    }

    /// Exported secret, wiped when dropped.
    pub fn secret_bytes(&self) -> BlsSecretKey {
        BlsSecretKey(self.secret.to_bytes())
    }
}

impl std::fmt::Debug for BlsKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlsKeyPair")
            .field("public", &hex::encode(self.public.to_bytes()))
            .finish_non_exhaustive()
    }
}

impl BlsPublicKey {
    /// True when `signature` is this member's signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &BlsSignature) -> bool {
        signature.0.verify(true, message, DST, &[], &self.0, true) == BLST_ERROR::BLST_SUCCESS
    }

    /// Decompress and subgroup-check a member key.
    pub fn from_bytes(bytes: &[u8; 48]) -> Result<Self, CryptoError> {
        PublicKey::from_bytes(bytes)
            .map(BlsPublicKey)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidPublicKey)?;
        let arr: [u8; 48] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: 48,
                    actual: bytes.len(),
                })?;
        Self::from_bytes(&arr)
    }

    pub fn to_bytes(&self) -> [u8; 48] {
        self.0.to_bytes()
    }
}

impl BlsSignature {
    /// Decompress a partial or aggregate signature.
    pub fn from_bytes(bytes: &[u8; 96]) -> Result<Self, CryptoError> {
        Signature::from_bytes(bytes)
            .map(BlsSignature)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    pub fn to_bytes(&self) -> [u8; 96] {
        self.0.to_bytes()
    }

    /// Aggregate signatures over the same message.
    pub fn aggregate(sigs: &[BlsSignature]) -> Result<Self, CryptoError> {
        if sigs.is_empty() {
            return Err(CryptoError::EmptyAggregate("signature"));
        }
        let refs: Vec<&Signature> = sigs.iter().map(|s| &s.0).collect();
        AggregateSignature::aggregate(&refs, true)
            .map(|asig| BlsSignature(asig.to_signature()))
            .map_err(|_| CryptoError::AggregationFailed)
    }
}

/// Aggregate raw 96-byte partial signatures.
pub fn aggregate_signatures(partials: &[[u8; 96]]) -> Result<[u8; 96], CryptoError> {
    let sigs = partials
        .iter()
        .map(BlsSignature::from_bytes)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BlsSignature::aggregate(&sigs)?.to_bytes())
}

/// Verify a single raw signature by a raw public key.
pub fn verify_signature(
    public_key: &[u8; 48],
    message: &[u8],
    signature: &[u8; 96],
) -> Result<(), CryptoError> {
    let pk = BlsPublicKey::from_bytes(public_key)?;
    let sig = BlsSignature::from_bytes(signature)?;
    if pk.verify(message, &sig) {
        Ok(())
    } else {
        Err(CryptoError::SignatureVerificationFailed)
    }
}

/// Verify an aggregate signature produced by the members of `committee`
/// selected by `signers_mask` (bit `i` = member `i`).
///
/// All members sign the same message, so the fast-aggregate path applies.
pub fn verify_aggregate(
    committee: &[[u8; 48]],
    signers_mask: u64,
    message: &[u8],
    signature: &[u8; 96],
) -> Result<(), CryptoError> {
    if signers_mask == 0 {
        return Err(CryptoError::EmptySignerSet);
    }
    let mut keys = Vec::with_capacity(signers_mask.count_ones() as usize);
    for i in 0..MAX_MASK_MEMBERS {
        if signers_mask & (1u64 << i) == 0 {
            continue;
        }
        let member = committee.get(i).ok_or_else(|| {
            CryptoError::SignerOutsideCommittee {
                index: i,
                size: committee.len(),
            }
        })?;
        keys.push(PublicKey::from_bytes(member).map_err(|_| CryptoError::InvalidPublicKey)?);
    }
    let sig = Signature::from_bytes(signature).map_err(|_| CryptoError::InvalidSignature)?;
    let refs: Vec<&PublicKey> = keys.iter().collect();
    match sig.fast_aggregate_verify(true, message, DST, &refs) {
        BLST_ERROR::BLST_SUCCESS => Ok(()),
        _ => Err(CryptoError::SignatureVerificationFailed),
    }
}
