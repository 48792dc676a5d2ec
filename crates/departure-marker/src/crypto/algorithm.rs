//! Supported signature algorithms.
//!
//! The set is closed: every dispatch on an algorithm is an exhaustive match,
//! so an unrecognized proof type or multicodec prefix can never fall through
//! to a default algorithm.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MarkerError;

/// Proof-type tag for Ed25519 signatures.
pub const ED25519_PROOF_TYPE: &str = "Ed25519Signature2020";
/// Proof-type tag for P-256 signatures.
pub const P256_PROOF_TYPE: &str = "EcdsaP256Signature2019";

/// A signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "ed25519")]
    Ed25519,
    #[serde(rename = "p256")]
    P256,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Ed25519, Algorithm::P256];

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::P256 => "p256",
        }
    }

    /// Proof-type tag written into `proof.type`.
    pub fn proof_type(self) -> &'static str {
        match self {
            Self::Ed25519 => ED25519_PROOF_TYPE,
            Self::P256 => P256_PROOF_TYPE,
        }
    }

    /// Resolve a proof-type tag. Unknown tags yield `None`, never a default.
    pub fn from_proof_type(tag: &str) -> Option<Self> {
        match tag {
            ED25519_PROOF_TYPE => Some(Self::Ed25519),
            P256_PROOF_TYPE => Some(Self::P256),
            _ => None,
        }
    }

    /// Varint-encoded multicodec prefix of the public key.
    ///
    /// `0xed` (ed25519-pub) and `0x1200` (p256-pub).
    pub fn multicodec_prefix(self) -> [u8; 2] {
        match self {
            Self::Ed25519 => [0xed, 0x01],
            Self::P256 => [0x80, 0x24],
        }
    }

    /// Recover the algorithm from the first two bytes of a multicodec key.
    pub fn from_multicodec(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xed, 0x01, ..] => Some(Self::Ed25519),
            [0x80, 0x24, ..] => Some(Self::P256),
            _ => None,
        }
    }

    /// Length of the encoded public key (P-256 keys are SEC1-compressed).
    pub fn public_key_len(self) -> usize {
        match self {
            Self::Ed25519 => 32,
            Self::P256 => 33,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = MarkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(Self::Ed25519),
            "p256" | "p-256" | "secp256r1" => Ok(Self::P256),
            other => Err(MarkerError::InvalidKey(format!(
                "unsupported algorithm '{other}'"
            ))),
        }
    }
}
