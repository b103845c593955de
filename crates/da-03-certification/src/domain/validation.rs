//! # Certificate Checks
//!
//! Pure checks of a certificate against a committee. No I/O.
//!
//! | Check | Rejects when |
//! |-------|--------------|
//! | expiry | `expiration < now` |
//! | membership | a mask bit falls outside the committee |
//! | quorum | signer count below `max(configured, committee.quorum)` |
//! | signature | aggregate does not verify over the signer subset |

use shared_crypto::verify_aggregate;
use shared_types::{Certificate, CommitteeInfo, DaError, Timestamp};

pub fn check_expiry(cert: &Certificate, now: Timestamp) -> Result<(), DaError> {
    if cert.expiration < now {
        return Err(DaError::invalid_certificate(format!(
            "expired at {} (now {})",
            cert.expiration, now
        )));
    }
    Ok(())
}

pub fn check_signers(
    cert: &Certificate,
    committee: &CommitteeInfo,
    min_quorum: usize,
) -> Result<(), DaError> {
    if cert.signers_mask == 0 {
        return Err(DaError::invalid_certificate("empty signer mask"));
    }
    if !committee.contains_mask(cert.signers_mask) {
        return Err(DaError::invalid_certificate(format!(
            "signer mask {:#x} exceeds committee of {} at height {}",
            cert.signers_mask,
            committee.members.len(),
            committee.height
        )));
    }
    let required = min_quorum.max(committee.quorum);
    if cert.signer_count() < required {
        return Err(DaError::invalid_certificate(format!(
            "{} signers, quorum {}",
            cert.signer_count(),
            required
        )));
    }
    Ok(())
}

pub fn check_signature(cert: &Certificate, committee: &CommitteeInfo) -> Result<(), DaError> {
    verify_aggregate(
        &committee.members,
        cert.signers_mask,
        &cert.message(),
        &cert.signature,
    )
    .map_err(|e| DaError::invalid_certificate(format!("aggregate signature: {}", e)))
}

/// All checks, cheapest first.
pub fn validate_certificate(
    cert: &Certificate,
    committee: &CommitteeInfo,
    min_quorum: usize,
    now: Timestamp,
) -> Result<(), DaError> {
    check_expiry(cert, now)?;
    check_signers(cert, committee, min_quorum)?;
    check_signature(cert, committee)
}
