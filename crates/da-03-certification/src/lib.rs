//! # DA Certification
//!
//! Produces and checks the certificates that make stored payloads
//! retrievable by handle.
//!
//! ## Components
//!
//! | Component | Port | Role |
//! |-----------|------|------|
//! | `CertifyingWriter` | `DaWriter` + `DaReader` | store, then sign `(hash, expiration)` |
//! | `ChainValidatingReader` | `DaReader` | validate against on-chain committee, then read |
//!
//! ## Validation Order
//!
//! 1. Expiry against the local clock.
//! 2. Committee at `committee_height` (LRU cache, bounded chain read).
//! 3. Mask subset of the committee and signer count at quorum.
//! 4. Aggregate BLS signature over the signer subset.
//! 5. Payload read and content hash check.

pub mod config;
pub mod domain;
pub mod service;

pub use config::{CertifyingWriterSettings, ValidationSettings};
pub use domain::{validate_certificate, CommitteeCache};
pub use service::{CertifyingWriter, ChainValidatingReader};
