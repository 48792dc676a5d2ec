//! The signature envelope shared by markers, intents, witnesses, key events
//! and batch roots.

use serde::{Deserialize, Serialize};

use crate::crypto::{decode_multibase, encode_multibase, Algorithm, PublicKey, Signer};
use crate::error::Result;
use crate::time::parse_rfc3339;

use super::domain;
use super::result::VerificationFailure;

/// A Data Integrity style proof.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataIntegrityProof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: String,
    pub verification_method: String,
    pub proof_value: String,
}

impl DataIntegrityProof {
    /// The all-blank proof an unsigned record carries.
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::default()
    }

    /// Sign `domain ‖ body` and wrap the signature.
    pub fn create(domain: &[u8], body: &[u8], signer: &dyn Signer) -> Result<Self> {
        let signature = signer.sign(&domain::separate(domain, body))?;
        let did = signer.did();
        let fragment = did.trim_start_matches(crate::crypto::did::DID_KEY_PREFIX).to_owned();
        Ok(Self {
            proof_type: signer.algorithm().proof_type().to_string(),
            created: crate::time::now_rfc3339(),
            verification_method: format!("{did}#{fragment}"),
            proof_value: encode_multibase(&signature),
        })
    }

    /// The `did:key` part of `verificationMethod`, without the fragment.
    pub fn signer_did(&self) -> &str {
        self.verification_method
            .split('#')
            .next()
            .unwrap_or_default()
    }

    /// Check this proof over `domain ‖ body`.
    ///
    /// Returns the verification key when it could be decoded, so callers can
    /// bind it to a subject, plus every failed check.
    pub fn check(
        &self,
        domain: &[u8],
        body: &[u8],
    ) -> (Option<PublicKey>, Vec<VerificationFailure>) {
        let mut failures = Vec::new();

        if self.is_placeholder() {
            failures.push(VerificationFailure::IncompleteProof(
                "proof has not been filled in".into(),
            ));
            return (None, failures);
        }

        let blank: Vec<&str> = [
            ("type", &self.proof_type),
            ("created", &self.created),
            ("verificationMethod", &self.verification_method),
            ("proofValue", &self.proof_value),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !blank.is_empty() {
            failures.push(VerificationFailure::IncompleteProof(format!(
                "missing {}",
                blank.join(", ")
            )));
            return (None, failures);
        }

        if parse_rfc3339(&self.created).is_none() {
            failures.push(VerificationFailure::MalformedInput(
                "proof.created is not an RFC 3339 timestamp".into(),
            ));
        }

        let declared = Algorithm::from_proof_type(&self.proof_type);
        if declared.is_none() {
            failures.push(VerificationFailure::UnknownProofType(
                self.proof_type.clone(),
            ));
        }

        let key = match PublicKey::from_did(&self.verification_method) {
            Ok(key) => Some(key),
            Err(e) => {
                failures.push(VerificationFailure::MalformedInput(format!(
                    "verificationMethod: {e}"
                )));
                None
            }
        };

        let signature = match decode_multibase(&self.proof_value) {
            Ok(sig) => Some(sig),
            Err(e) => {
                failures.push(VerificationFailure::MalformedInput(format!(
                    "proofValue: {e}"
                )));
                None
            }
        };

        if let (Some(declared), Some(key)) = (declared, key.as_ref()) {
            if declared != key.algorithm() {
                failures.push(VerificationFailure::AlgorithmMismatch {
                    proof_type: self.proof_type.clone(),
                    key_algorithm: key.algorithm(),
                });
            }
        }

        if let (Some(key), Some(signature)) = (key.as_ref(), signature.as_ref()) {
            if !key.verify(&domain::separate(domain, body), signature) {
                failures.push(VerificationFailure::SignatureInvalid);
            }
        }

        (key, failures)
    }
}
