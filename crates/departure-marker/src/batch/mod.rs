//! Merkle batching of finished markers.

pub mod exit;
pub mod merkle;

pub use exit::BatchExit;
pub use merkle::{
    combine, compute_merkle_proof, compute_merkle_root, verify_batch_membership,
    verify_merkle_proof, MerkleProof, Position, ProofStep,
};
