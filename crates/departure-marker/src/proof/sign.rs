//! Marker signing.

use crate::canonical;
use crate::crypto::Signer;
use crate::error::{MarkerError, Result};
use crate::marker::{validate, DepartureMarker};

use super::domain;
use super::envelope::DataIntegrityProof;

/// `domain ‖ canonical(marker − {proof, id})`.
pub fn signing_payload(domain: &[u8], marker: &DepartureMarker) -> Result<Vec<u8>> {
    let view = canonical::signing_view(marker)?;
    Ok(domain::separate(
        domain,
        canonical::try_canonicalize(&view)?.as_bytes(),
    ))
}

/// Sign a marker as its subject.
///
/// Returns a copy with `id` recomputed and `proof` replaced; an earlier
/// proof is discarded, never kept alongside.
pub fn sign_marker(marker: &DepartureMarker, signer: &dyn Signer) -> Result<DepartureMarker> {
    let issues = validate(marker);
    if !issues.is_empty() {
        return Err(MarkerError::Validation(issues));
    }

    let view = canonical::signing_view(marker)?;
    let body = canonical::try_canonicalize(&view)?;

    let mut signed = marker.clone();
    signed.id = canonical::sha256_hex(body.as_bytes());
    signed.proof = DataIntegrityProof::create(domain::MARKER, body.as_bytes(), signer)?;

    log::debug!(
        "signed marker {} with {} key {}",
        signed.id,
        signer.algorithm(),
        signed.proof.signer_did()
    );
    Ok(signed)
}
