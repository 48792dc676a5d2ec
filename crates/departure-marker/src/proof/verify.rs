//! Marker verification.
//!
//! Verification never fails with an error: adversarial input degrades to a
//! [`VerificationResult`] listing every check that did not pass.

use crate::canonical;
use crate::crypto::{is_did, Algorithm, PublicKey};
use crate::marker::{validate, DepartureMarker};
use crate::telemetry::{NoopTelemetry, Outcome, Telemetry, TelemetryEvent};

use super::domain;
use super::envelope::DataIntegrityProof;
use super::result::{VerificationFailure, VerificationResult};

/// Verify a signed marker.
///
/// Checks structure, the content address, the signature under the key named
/// by `verificationMethod`, that the proof type matches that key's
/// algorithm, and that a DID-shaped subject names that same key.
pub fn verify_marker(marker: &DepartureMarker) -> VerificationResult {
    verify_marker_with(marker, &NoopTelemetry)
}

/// [`verify_marker`], reporting the outcome to `telemetry`.
pub fn verify_marker_with(marker: &DepartureMarker, telemetry: &dyn Telemetry) -> VerificationResult {
    let result = check_marker(marker);
    report(telemetry, "verify_marker", Some(&marker.proof), &marker.id, &result);
    result
}

fn check_marker(marker: &DepartureMarker) -> VerificationResult {
    let mut errors: Vec<VerificationFailure> = validate(marker)
        .into_iter()
        .map(VerificationFailure::Schema)
        .collect();

    let view = match canonical::signing_view(marker) {
        Ok(view) => view,
        Err(e) => {
            errors.push(VerificationFailure::MalformedInput(e.to_string()));
            return finish(marker, errors);
        }
    };
    let body = canonical::canonicalize(&view);

    let computed = canonical::sha256_hex(body.as_bytes());
    if !marker.id.is_empty() && marker.id != computed {
        errors.push(VerificationFailure::IdMismatch {
            declared: marker.id.clone(),
            computed,
        });
    }

    let (key, failures) = marker.proof.check(domain::MARKER, body.as_bytes());
    errors.extend(failures);

    if let Some(key) = key {
        if let Some(forgery) = check_attribution(&marker.subject, &key) {
            errors.push(forgery);
        }
    }

    finish(marker, errors)
}

/// Parse and verify marker JSON. Parse failures are `MalformedInput`.
pub fn verify_marker_json(json: &str) -> VerificationResult {
    verify_marker_json_with(json, &NoopTelemetry)
}

pub fn verify_marker_json_with(json: &str, telemetry: &dyn Telemetry) -> VerificationResult {
    match serde_json::from_str::<DepartureMarker>(json) {
        Ok(marker) => verify_marker_with(&marker, telemetry),
        Err(e) => {
            log::warn!("rejected unparseable marker: {e}");
            let result = VerificationResult::malformed(format!("invalid marker JSON: {e}"));
            report(telemetry, "verify_marker", None, "", &result);
            result
        }
    }
}

/// A DID-shaped subject must resolve to the signing key. Other subjects are
/// not bound.
pub(crate) fn check_attribution(subject: &str, key: &PublicKey) -> Option<VerificationFailure> {
    if subject.is_empty() || !is_did(subject) {
        return None;
    }
    let bound = PublicKey::from_did(subject).is_ok_and(|subject_key| subject_key == *key);
    (!bound).then(|| VerificationFailure::AttributionForgery {
        subject: subject.to_string(),
        signer: key.to_did(),
    })
}

/// Send a verification outcome to `telemetry`. Only the proof's public
/// attributes are reported.
pub(crate) fn report(
    telemetry: &dyn Telemetry,
    operation: &'static str,
    proof: Option<&DataIntegrityProof>,
    subject_id: &str,
    result: &VerificationResult,
) {
    let outcome = if result.valid {
        Outcome::Success
    } else {
        Outcome::Failure(result.codes().join(","))
    };
    let mut event = TelemetryEvent::new(operation, outcome);
    if let Some(proof) = proof {
        event.algorithm = Algorithm::from_proof_type(&proof.proof_type);
        if !proof.signer_did().is_empty() {
            event = event.did(proof.signer_did());
        }
    }
    if !subject_id.is_empty() {
        event = event.marker_id(subject_id);
    }
    telemetry.record(&event);
}

fn finish(marker: &DepartureMarker, errors: Vec<VerificationFailure>) -> VerificationResult {
    let result = VerificationResult::from_failures(errors);
    if result.valid {
        log::debug!("marker {} verified", marker.id);
    } else {
        log::warn!(
            "marker {} failed verification: {}",
            marker.id,
            result.codes().join(",")
        );
    }
    result
}
