//! Error types for departure markers.
//!
//! All errors are strongly typed and propagated without panicking.
//! Private key material is never included in error messages.
//!
//! Verification of untrusted markers does not use these types: it returns a
//! [`crate::proof::VerificationResult`] instead, so adversarial input always
//! degrades to a structured "invalid" answer.

use std::fmt;

use crate::ceremony::CeremonyState;

/// A single structural problem found while validating a marker.
///
/// Validation collects every issue before failing; `field` uses the JSON
/// (camelCase) name so the message can be shown to whoever wrote the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Reasons a key event log append or replay is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyLogViolation {
    #[error("key event log is empty")]
    EmptyLog,

    #[error("first event must be an inception event")]
    MissingInception,

    #[error("inception event found at sequence {0}")]
    DuplicateInception(u64),

    #[error("expected sequence {expected}, got {actual}")]
    SequenceGap { expected: u64, actual: u64 },

    #[error("identifier mismatch: log is {expected}, event claims {actual}")]
    IdentifierMismatch { expected: String, actual: String },

    #[error("prior event digest mismatch at sequence {sequence}")]
    PriorDigestMismatch { sequence: u64 },

    #[error("event at sequence {sequence} signed by unauthorized key {signer}")]
    UnauthorizedSigner { sequence: u64, signer: String },

    #[error("invalid event signature at sequence {sequence}")]
    InvalidSignature { sequence: u64 },

    #[error("key {key} at sequence {sequence} was not pre-committed")]
    UncommittedKey { sequence: u64, key: String },

    #[error("event at sequence {sequence} declares no signing keys")]
    EmptyKeySet { sequence: u64 },

    #[error("malformed event at sequence {sequence}: {reason}")]
    Malformed { sequence: u64, reason: String },
}

/// Crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error("Marker validation failed: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Invalid DID: {0}")]
    InvalidDid(String),

    #[error("Unknown multicodec prefix: {0}")]
    UnknownMulticodec(String),

    #[error("Unknown proof type: {0}")]
    UnknownProofType(String),

    #[error("Illegal ceremony transition {from} -> {to} (legal next: {})", describe_legal(.legal))]
    IllegalTransition {
        from: CeremonyState,
        to: CeremonyState,
        legal: Vec<CeremonyState>,
    },

    #[error(
        "Ceremony has departed; '{operation}' ({from} -> {to}) is not allowed (legal next: {})",
        describe_legal(.legal)
    )]
    TerminalState {
        operation: String,
        from: CeremonyState,
        to: CeremonyState,
        legal: Vec<CeremonyState>,
    },

    #[error("Signing from {state} requires an emergency departure")]
    EmergencyPathRequired { state: CeremonyState },

    #[error("Departure type mismatch: intent declared {declared}, marker has {actual}")]
    DepartureTypeMismatch { declared: String, actual: String },

    #[error("No signed marker in this ceremony")]
    NoSignedMarker,

    #[error("Operation '{operation}' requires the Final state, ceremony is in {state}")]
    NotFinal {
        operation: String,
        state: CeremonyState,
    },

    #[error("Key event log rejected: {0}")]
    KeyLog(#[from] KeyLogViolation),

    #[error("Batch error: {0}")]
    Batch(String),

    #[error("Canonicalization error: {0}")]
    Canonicalization(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Invalid passphrase")]
    InvalidPassphrase,

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Frame error: {0}")]
    Frame(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for MarkerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_legal(legal: &[CeremonyState]) -> String {
    if legal.is_empty() {
        return "none, terminal".to_string();
    }
    legal
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, MarkerError>;
