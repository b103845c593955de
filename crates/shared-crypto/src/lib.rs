//! # Shared Crypto - BLS Certification Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `bls` | BLS12-381 (`min_pk`) | Certificate signing and aggregation |
//!
//! ## Security Properties
//!
//! - **Proof-of-possession DST**: rogue-key safe fast aggregate verification
//! - **Subgroup checks**: enabled on every deserialized key and signature
//! - **Zeroize**: secret key material is wiped on drop

#![warn(clippy::all)]

pub mod bls;
pub mod errors;

// Re-exports
pub use bls::{
    aggregate_signatures, verify_aggregate, verify_signature, BlsKeyPair, BlsPublicKey,
    BlsSecretKey, BlsSignature,
};
pub use errors::CryptoError;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
