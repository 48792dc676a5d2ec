//! Key events: inception and rotation.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::crypto::Signer;
use crate::error::{MarkerError, Result, ValidationIssue};
use crate::proof::{domain, DataIntegrityProof};

/// SHA-256 commitment to a key, as hex over the DID string.
///
/// The DID carries the multicodec prefix, so the digest commits to the
/// algorithm as well as the key bytes.
pub fn key_digest(did: &str) -> String {
    canonical::sha256_hex(did.split('#').next().unwrap_or_default().as_bytes())
}

/// Why a key was rotated out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RotationReason {
    Scheduled,
    Compromised,
    DeviceLost,
    Manual,
}

impl RotationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Compromised => "compromised",
            Self::DeviceLost => "deviceLost",
            Self::Manual => "manual",
        }
    }
}

impl FromStr for RotationReason {
    type Err = MarkerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "compromised" => Ok(Self::Compromised),
            "devicelost" => Ok(Self::DeviceLost),
            "manual" => Ok(Self::Manual),
            _ => Err(MarkerError::Validation(vec![ValidationIssue::new(
                "reason",
                format!("unknown rotation reason '{s}'"),
            )])),
        }
    }
}

/// First event of a log. Establishes the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InceptionEvent {
    pub identifier: String,
    pub sequence: u64,
    /// Currently authorized signing keys (`did:key`).
    pub keys: Vec<String>,
    /// Digests of the keys the next rotation must install.
    pub next_key_digests: Vec<String>,
    pub created: String,
    pub proof: DataIntegrityProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationEvent {
    pub identifier: String,
    pub sequence: u64,
    /// Digest of the full previous event, proof included.
    pub prior_event_digest: String,
    pub keys: Vec<String>,
    pub next_key_digests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RotationReason>,
    pub created: String,
    pub proof: DataIntegrityProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum KeyEvent {
    Inception(InceptionEvent),
    Rotation(RotationEvent),
}

impl KeyEvent {
    pub fn sequence(&self) -> u64 {
        match self {
            Self::Inception(e) => e.sequence,
            Self::Rotation(e) => e.sequence,
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            Self::Inception(e) => &e.identifier,
            Self::Rotation(e) => &e.identifier,
        }
    }

    pub fn keys(&self) -> &[String] {
        match self {
            Self::Inception(e) => &e.keys,
            Self::Rotation(e) => &e.keys,
        }
    }

    pub fn next_key_digests(&self) -> &[String] {
        match self {
            Self::Inception(e) => &e.next_key_digests,
            Self::Rotation(e) => &e.next_key_digests,
        }
    }

    pub fn proof(&self) -> &DataIntegrityProof {
        match self {
            Self::Inception(e) => &e.proof,
            Self::Rotation(e) => &e.proof,
        }
    }

    /// Canonical bytes the event proof covers: the tagged event minus `proof`.
    pub fn signing_body(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        let view = canonical::strip_fields(value, &["proof"]);
        canonical::try_canonicalize(&view)
    }

    /// Digest of the whole event, proof included. The next rotation's
    /// `priorEventDigest` must equal this.
    pub fn digest(&self) -> Result<String> {
        canonical::content_address(self, &[])
    }
}

fn sign_event(event: KeyEvent, signer: &dyn Signer) -> Result<DataIntegrityProof> {
    let body = event.signing_body()?;
    DataIntegrityProof::create(domain::KEY_EVENT, body.as_bytes(), signer)
}

impl InceptionEvent {
    /// Fill in the proof over the signing body.
    pub(crate) fn sign(&mut self, signer: &dyn Signer) -> Result<()> {
        self.proof = sign_event(KeyEvent::Inception(self.clone()), signer)?;
        Ok(())
    }
}

impl RotationEvent {
    pub(crate) fn sign(&mut self, signer: &dyn Signer) -> Result<()> {
        self.proof = sign_event(KeyEvent::Rotation(self.clone()), signer)?;
        Ok(())
    }
}

/// Identifier of a log: content address of the inception event without
/// `identifier` and `proof`.
pub fn inception_identifier(event: &InceptionEvent) -> Result<String> {
    canonical::content_address(
        &KeyEvent::Inception(event.clone()),
        &["identifier", "proof"],
    )
}
