//! Pure certificate validation and committee caching.

pub mod committee_cache;
pub mod validation;

pub use committee_cache::CommitteeCache;
pub use validation::{check_expiry, check_signature, check_signers, validate_certificate};
