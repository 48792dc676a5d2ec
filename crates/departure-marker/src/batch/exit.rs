//! Batch exits: many markers committed to one signed root.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::crypto::Signer;
use crate::error::{MarkerError, Result};
use crate::marker::DepartureMarker;
use crate::proof::{domain, DataIntegrityProof, VerificationResult};

use super::merkle::{build_levels, proof_from_levels, Hash, MerkleProof};

/// A Merkle commitment over a set of markers.
///
/// Levels are computed once at build time; each proof is a walk up them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchExit {
    pub root: String,
    /// Content addresses in leaf order.
    pub marker_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<DataIntegrityProof>,
    #[serde(skip)]
    levels: Vec<Vec<Hash>>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl BatchExit {
    /// Commit to `markers`, addressed by their recomputed content ids.
    pub fn build(markers: &[DepartureMarker]) -> Result<Self> {
        let marker_ids = markers
            .iter()
            .map(canonical::compute_id)
            .collect::<Result<Vec<_>>>()?;
        Self::from_ids(marker_ids)
    }

    /// Commit to already-computed content addresses.
    pub fn from_ids(marker_ids: Vec<String>) -> Result<Self> {
        let levels = build_levels(&marker_ids)?;
        let root = hex::encode(levels[levels.len() - 1][0]);
        let mut positions = HashMap::with_capacity(marker_ids.len());
        for (i, id) in marker_ids.iter().enumerate() {
            positions.entry(id.clone()).or_insert(i);
        }
        log::debug!("built batch of {} markers, root {root}", marker_ids.len());
        Ok(Self {
            root,
            marker_ids,
            proof: None,
            levels,
            positions,
        })
    }

    pub fn len(&self) -> usize {
        self.marker_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marker_ids.is_empty()
    }

    /// Inclusion proof for a marker id. With duplicate ids the first
    /// occurrence is proven.
    pub fn proof_for(&self, marker_id: &str) -> Option<MerkleProof> {
        let index = *self.positions.get(marker_id)?;
        self.proof_at(index).ok()
    }

    pub fn proof_at(&self, index: usize) -> Result<MerkleProof> {
        if self.levels.is_empty() {
            return Err(MarkerError::Batch(
                "batch was deserialized without its tree; rebuild it".into(),
            ));
        }
        proof_from_levels(&self.levels, index)
    }

    /// Sign the root under the batch prefix.
    pub fn sign(&mut self, signer: &dyn Signer) -> Result<()> {
        self.proof = Some(DataIntegrityProof::create(
            domain::BATCH,
            self.root.as_bytes(),
            signer,
        )?);
        Ok(())
    }

    pub fn verify_signature(&self) -> VerificationResult {
        match &self.proof {
            Some(proof) => {
                let (_, failures) = proof.check(domain::BATCH, self.root.as_bytes());
                VerificationResult::from_failures(failures)
            }
            None => VerificationResult::from_failures(vec![
                crate::proof::VerificationFailure::IncompleteProof("batch root is unsigned".into()),
            ]),
        }
    }
}
