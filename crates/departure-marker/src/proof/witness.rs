//! Witness co-signatures.
//!
//! A witness signs the same canonical view as the subject, under the witness
//! prefix. The attestation travels next to the marker; the subject's proof
//! is never touched.

use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::crypto::{PublicKey, Signer};
use crate::error::Result;
use crate::marker::DepartureMarker;
use crate::telemetry::{NoopTelemetry, Telemetry};

use super::domain;
use super::envelope::DataIntegrityProof;
use super::result::{VerificationFailure, VerificationResult};

/// A witness's signature over a marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WitnessAttestation {
    /// Content address of the witnessed marker.
    pub marker_id: String,
    /// `did:key` of the witness.
    pub witness: String,
    pub proof: DataIntegrityProof,
}

/// Co-sign `marker` as a witness.
pub fn witness_marker(marker: &DepartureMarker, signer: &dyn Signer) -> Result<WitnessAttestation> {
    let view = canonical::signing_view(marker)?;
    let body = canonical::try_canonicalize(&view)?;
    let attestation = WitnessAttestation {
        marker_id: canonical::sha256_hex(body.as_bytes()),
        witness: signer.did(),
        proof: DataIntegrityProof::create(domain::WITNESS, body.as_bytes(), signer)?,
    };
    log::debug!(
        "{} witnessed marker {}",
        attestation.witness,
        attestation.marker_id
    );
    Ok(attestation)
}

/// Verify a witness attestation against the marker it claims to cover.
pub fn verify_witness(marker: &DepartureMarker, attestation: &WitnessAttestation) -> VerificationResult {
    verify_witness_with(marker, attestation, &NoopTelemetry)
}

/// [`verify_witness`], reporting the outcome to `telemetry`.
pub fn verify_witness_with(
    marker: &DepartureMarker,
    attestation: &WitnessAttestation,
    telemetry: &dyn Telemetry,
) -> VerificationResult {
    let result = check_witness(marker, attestation);
    super::verify::report(
        telemetry,
        "verify_witness",
        Some(&attestation.proof),
        &attestation.marker_id,
        &result,
    );
    result
}

fn check_witness(marker: &DepartureMarker, attestation: &WitnessAttestation) -> VerificationResult {
    let view = match canonical::signing_view(marker) {
        Ok(view) => view,
        Err(e) => return VerificationResult::malformed(e.to_string()),
    };
    let body = canonical::canonicalize(&view);

    let mut errors = Vec::new();
    let computed = canonical::sha256_hex(body.as_bytes());
    if attestation.marker_id != computed {
        errors.push(VerificationFailure::IdMismatch {
            declared: attestation.marker_id.clone(),
            computed,
        });
    }

    let (key, failures) = attestation.proof.check(domain::WITNESS, body.as_bytes());
    errors.extend(failures);

    if let Some(key) = key {
        let named = PublicKey::from_did(&attestation.witness).is_ok_and(|w| w == key);
        if !named {
            errors.push(VerificationFailure::AttributionForgery {
                subject: attestation.witness.clone(),
                signer: key.to_did(),
            });
        }
    }

    VerificationResult::from_failures(errors)
}
