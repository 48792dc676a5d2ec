//! Structured verification outcomes.

use std::fmt;

use crate::crypto::Algorithm;
use crate::error::ValidationIssue;

/// One failed verification check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationFailure {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("incomplete proof: {0}")]
    IncompleteProof(String),

    #[error("signature does not verify")]
    SignatureInvalid,

    #[error("attribution forgery: subject {subject} but signed by {signer}")]
    AttributionForgery { subject: String, signer: String },

    #[error("algorithm mismatch: proof type {proof_type} but key is {key_algorithm}")]
    AlgorithmMismatch {
        proof_type: String,
        key_algorithm: Algorithm,
    },

    #[error("unknown proof type '{0}'")]
    UnknownProofType(String),

    #[error("id mismatch: declared {declared}, computed {computed}")]
    IdMismatch { declared: String, computed: String },

    #[error("schema: {0}")]
    Schema(ValidationIssue),
}

impl VerificationFailure {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "malformed_input",
            Self::IncompleteProof(_) => "incomplete_proof",
            Self::SignatureInvalid => "signature_invalid",
            Self::AttributionForgery { .. } => "attribution_forgery",
            Self::AlgorithmMismatch { .. } => "algorithm_mismatch",
            Self::UnknownProofType(_) => "unknown_proof_type",
            Self::IdMismatch { .. } => "id_mismatch",
            Self::Schema(_) => "schema",
        }
    }
}

/// Outcome of verifying a marker, intent, witness attestation or batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub valid: bool,
    pub errors: Vec<VerificationFailure>,
}

impl VerificationResult {
    pub fn from_failures(errors: Vec<VerificationFailure>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::from_failures(vec![VerificationFailure::MalformedInput(reason.into())])
    }

    /// Whether any failure carries `code`.
    pub fn has(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code() == code)
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.errors.iter().map(VerificationFailure::code).collect()
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return f.write_str("valid");
        }
        write!(f, "invalid")?;
        for e in &self.errors {
            write!(f, "\n  [{}] {e}", e.code())?;
        }
        Ok(())
    }
}
