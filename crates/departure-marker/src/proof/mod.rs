//! Proofs: domain-separated signatures and their verification.

pub mod domain;
pub mod envelope;
pub mod intent;
pub mod result;
pub mod sign;
pub mod verify;
pub mod witness;

pub use envelope::DataIntegrityProof;
pub use intent::{sign_intent, verify_intent, DepartureIntent, SignedIntent};
pub use result::{VerificationFailure, VerificationResult};
pub use sign::{sign_marker, signing_payload};
pub use verify::{verify_marker, verify_marker_json, verify_marker_json_with, verify_marker_with};
pub use witness::{verify_witness, verify_witness_with, witness_marker, WitnessAttestation};
