//! Merkle trees over content addresses.
//!
//! Pairs are combined smaller-first, so folding a proof does not depend on
//! sibling position. A node without a partner pairs with itself.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical;
use crate::error::{MarkerError, Result};
use crate::marker::DepartureMarker;

pub type Hash = [u8; 32];

/// SHA-256 of the two digests, lexicographically smaller first.
pub fn combine(a: &Hash, b: &Hash) -> Hash {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update(lo);
    hasher.update(hi);
    hasher.finalize().into()
}

/// Which side the sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub hash: String,
    pub position: Position,
}

/// Inclusion proof for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: String,
    pub siblings: Vec<ProofStep>,
    pub root: String,
}

pub(crate) fn decode_leaf(hex_digest: &str) -> Result<Hash> {
    let bytes = hex::decode(hex_digest)
        .map_err(|e| MarkerError::Batch(format!("leaf '{hex_digest}' is not hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| MarkerError::Batch(format!("leaf '{hex_digest}' is not 32 bytes")))
}

/// Every level of the tree, leaves first, root last.
pub(crate) fn build_levels(leaves: &[String]) -> Result<Vec<Vec<Hash>>> {
    if leaves.is_empty() {
        return Err(MarkerError::Batch("cannot build a tree with no leaves".into()));
    }
    let mut level: Vec<Hash> = leaves
        .iter()
        .map(String::as_str)
        .map(decode_leaf)
        .collect::<Result<_>>()?;
    let mut levels = Vec::new();
    while level.len() > 1 {
        let next = level
            .chunks(2)
            .map(|pair| combine(&pair[0], pair.get(1).unwrap_or(&pair[0])))
            .collect();
        levels.push(std::mem::replace(&mut level, next));
    }
    levels.push(level);
    Ok(levels)
}

pub(crate) fn proof_from_levels(levels: &[Vec<Hash>], index: usize) -> Result<MerkleProof> {
    let leaves = levels.first().map(Vec::len).unwrap_or(0);
    if index >= leaves {
        return Err(MarkerError::Batch(format!(
            "index {index} out of range for {leaves} leaves"
        )));
    }

    let mut siblings = Vec::with_capacity(levels.len().saturating_sub(1));
    let mut i = index;
    for level in &levels[..levels.len() - 1] {
        let (sibling, position) = if i % 2 == 0 {
            (level.get(i + 1).unwrap_or(&level[i]), Position::Right)
        } else {
            (&level[i - 1], Position::Left)
        };
        siblings.push(ProofStep {
            hash: hex::encode(sibling),
            position,
        });
        i /= 2;
    }

    Ok(MerkleProof {
        leaf: hex::encode(levels[0][index]),
        siblings,
        root: hex::encode(levels[levels.len() - 1][0]),
    })
}

pub fn compute_merkle_root(leaves: &[String]) -> Result<String> {
    let levels = build_levels(leaves)?;
    Ok(hex::encode(levels[levels.len() - 1][0]))
}

pub fn compute_merkle_proof(leaves: &[String], index: usize) -> Result<MerkleProof> {
    proof_from_levels(&build_levels(leaves)?, index)
}

/// Fold the proof and compare with both its own root and `expected_root`.
pub fn verify_merkle_proof(proof: &MerkleProof, expected_root: &str) -> bool {
    if proof.root != expected_root {
        return false;
    }
    let Ok(mut acc) = decode_leaf(&proof.leaf) else {
        return false;
    };
    for step in &proof.siblings {
        let Ok(sibling) = decode_leaf(&step.hash) else {
            return false;
        };
        acc = combine(&acc, &sibling);
    }
    hex::encode(acc) == expected_root
}

/// Whether `marker` is the leaf `proof` commits to under `expected_root`.
pub fn verify_batch_membership(
    marker: &DepartureMarker,
    proof: &MerkleProof,
    expected_root: &str,
) -> bool {
    match canonical::compute_id(marker) {
        Ok(id) => id == proof.leaf && verify_merkle_proof(proof, expected_root),
        Err(_) => false,
    }
}
