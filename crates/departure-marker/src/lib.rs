//! Departure markers: signed, content-addressed records that an agent left
//! a platform.
//!
//! Provides canonical encoding and content addressing, Ed25519 and P-256
//! proofs bound to `did:key` subjects, an exit ceremony state machine,
//! pre-rotated key event logs, and Merkle batches for mass departures.
//! Storage, framing, telemetry and claim indexing are thin adapters over the
//! core.

pub mod batch;
pub mod canonical;
pub mod ceremony;
pub mod claims;
pub mod crypto;
pub mod error;
pub mod keylog;
pub mod marker;
pub mod proof;
pub mod storage;
pub mod telemetry;
pub mod time;
pub mod transport;

// Re-export primary types
pub use error::{KeyLogViolation, MarkerError, Result, ValidationIssue};
pub use marker::{
    DepartureMarker, DepartureType, IdentityClaim, LegalHold, MarkerBuilder, Standing,
    TimestampAttestation, TrustEnhancers, WitnessReference, MARKER_CONTEXT, SPEC_VERSION,
};

// Re-export signing and verification
pub use canonical::{canonicalize, compute_id};
pub use crypto::{Algorithm, Ed25519KeyPair, KeyPair, P256KeyPair, PublicKey, Signer};
pub use proof::{
    sign_marker, verify_marker, verify_marker_json, verify_marker_json_with, verify_marker_with,
    verify_witness, verify_witness_with, witness_marker, DataIntegrityProof, VerificationFailure,
    VerificationResult, WitnessAttestation,
};

// Re-export ceremony types
pub use ceremony::{CeremonyPath, CeremonyState, CeremonyStateMachine};

// Re-export key log types
pub use keylog::{
    is_key_compromised, InceptionEvent, KeyEvent, KeyEventLog, KeyState, PreRotatedIdentity,
    RotationEvent, SharedKeyEventLog,
};

// Re-export batch types
pub use batch::{
    compute_merkle_proof, compute_merkle_root, verify_batch_membership, verify_merkle_proof,
    BatchExit, MerkleProof,
};

pub use telemetry::{LogTelemetry, NoopTelemetry, Telemetry};
