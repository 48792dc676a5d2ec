//! Signed declarations of intent to depart.

use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::crypto::Signer;
use crate::error::Result;
use crate::marker::DepartureType;

use super::domain;
use super::envelope::DataIntegrityProof;
use super::result::VerificationResult;
use super::verify::check_attribution;

/// What the subject announces before the marker exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartureIntent {
    pub subject: String,
    pub origin: String,
    pub departure_type: DepartureType,
    pub declared_at: String,
}

impl DepartureIntent {
    pub fn new(
        subject: impl Into<String>,
        origin: impl Into<String>,
        departure_type: DepartureType,
    ) -> Self {
        Self {
            subject: subject.into(),
            origin: origin.into(),
            departure_type,
            declared_at: crate::time::now_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedIntent {
    pub intent: DepartureIntent,
    pub proof: DataIntegrityProof,
}

pub fn sign_intent(intent: DepartureIntent, signer: &dyn Signer) -> Result<SignedIntent> {
    let body = canonical::canonicalize_serializable(&intent)?;
    let proof = DataIntegrityProof::create(domain::INTENT, body.as_bytes(), signer)?;
    Ok(SignedIntent { intent, proof })
}

/// Verify an intent's signature and its binding to the declared subject.
pub fn verify_intent(signed: &SignedIntent) -> VerificationResult {
    let body = match canonical::canonicalize_serializable(&signed.intent) {
        Ok(body) => body,
        Err(e) => return VerificationResult::malformed(e.to_string()),
    };
    let (key, mut errors) = signed.proof.check(domain::INTENT, body.as_bytes());
    if let Some(forgery) = key.and_then(|k| check_attribution(&signed.intent.subject, &k)) {
        errors.push(forgery);
    }
    VerificationResult::from_failures(errors)
}
