//! The signing capability and multi-algorithm verification.
//!
//! [`Signer`] is the single interface every signing path takes. In-process
//! key pairs implement it synchronously; remote custody (HSM, KMS) implements
//! the same trait and does its own I/O inside `sign`.

use std::fmt;

use ed25519_dalek::{Signature as Ed25519Signature, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::{Signature as P256Signature, VerifyingKey as P256VerifyingKey};

use crate::error::{MarkerError, Result};

use super::algorithm::Algorithm;
use super::did;

/// A signing capability.
pub trait Signer: Send + Sync {
    /// The algorithm this signer produces signatures for.
    fn algorithm(&self) -> Algorithm;

    /// Raw public key bytes (32 for Ed25519, 33 compressed for P-256).
    fn public_key(&self) -> Vec<u8>;

    /// Sign a message, returning raw signature bytes.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;

    /// The `did:key` naming this signer's public key.
    fn did(&self) -> String {
        did::encode_did(self.algorithm(), &self.public_key())
    }

    /// Verify a signature against this signer's public key.
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        verify_signature(self.algorithm(), &self.public_key(), message, signature)
    }
}

/// A verifying key of either supported algorithm.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum PublicKey {
    Ed25519(Ed25519VerifyingKey),
    P256(P256VerifyingKey),
}

impl PublicKey {
    /// Parse raw public key bytes for `algorithm`.
    pub fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self> {
        match algorithm {
            Algorithm::Ed25519 => {
                let arr: [u8; 32] = bytes.try_into().map_err(|_| {
                    MarkerError::InvalidKey("ed25519 public key must be 32 bytes".into())
                })?;
                Ed25519VerifyingKey::from_bytes(&arr)
                    .map(Self::Ed25519)
                    .map_err(|e| MarkerError::InvalidKey(format!("invalid ed25519 key: {e}")))
            }
            Algorithm::P256 => P256VerifyingKey::from_sec1_bytes(bytes)
                .map(Self::P256)
                .map_err(|e| MarkerError::InvalidKey(format!("invalid p256 key: {e}"))),
        }
    }

    /// Resolve a `did:key` into a verifying key.
    pub fn from_did(did: &str) -> Result<Self> {
        let (algorithm, bytes) = did::decode_did(did)?;
        Self::from_bytes(algorithm, &bytes)
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Ed25519(_) => Algorithm::Ed25519,
            Self::P256(_) => Algorithm::P256,
        }
    }

    /// Raw public key bytes in the encoding used inside DIDs.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Ed25519(vk) => vk.to_bytes().to_vec(),
            Self::P256(vk) => vk.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    pub fn to_did(&self) -> String {
        did::encode_did(self.algorithm(), &self.to_bytes())
    }

    /// Verify a raw signature. Malformed signatures verify as `false`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            Self::Ed25519(vk) => {
                let Ok(arr): std::result::Result<[u8; 64], _> = signature.try_into() else {
                    return false;
                };
                vk.verify_strict(message, &Ed25519Signature::from_bytes(&arr))
                    .is_ok()
            }
            Self::P256(vk) => {
                use p256::ecdsa::signature::Verifier as _;
                // Compact r || s only; DER is deliberately not accepted.
                if signature.len() != 64 {
                    return false;
                }
                let Ok(sig) = P256Signature::from_slice(signature) else {
                    return false;
                };
                vk.verify(message, &sig).is_ok()
            }
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_did())
    }
}

/// Verify `signature` over `message` with a raw public key.
pub fn verify_signature(
    algorithm: Algorithm,
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> bool {
    PublicKey::from_bytes(algorithm, public_key)
        .map(|pk| pk.verify(message, signature))
        .unwrap_or(false)
}
