//! Ed25519 and P-256 key pair generation.
//!
//! Both key pair types implement [`Signer`] directly, so raw key material is
//! used through the same capability interface as remote or hardware custody.
//! The underlying signing keys zeroize themselves on drop.

use ed25519_dalek::{SigningKey, VerifyingKey};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};

use crate::error::{MarkerError, Result};

use super::algorithm::Algorithm;
use super::signing::Signer;

/// An Ed25519 key pair.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl Ed25519KeyPair {
    /// Generate a new random Ed25519 key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct a key pair from raw signing key bytes.
    pub fn from_signing_key_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Return a reference to the signing key.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Return the verifying (public) key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Return the signing key bytes. Caller must zeroize after use.
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Return the verifying key bytes.
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }
}

impl Signer for Ed25519KeyPair {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Ed25519
    }

    fn public_key(&self) -> Vec<u8> {
        self.verifying_key.to_bytes().to_vec()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        use ed25519_dalek::Signer as _;
        Ok(self.signing_key.sign(message).to_bytes().to_vec())
    }
}

/// A P-256 (secp256r1) ECDSA key pair.
///
/// Signatures are the 64-byte compact `r || s` form over a SHA-256 pre-hash
/// with RFC 6979 deterministic nonces.
pub struct P256KeyPair {
    signing_key: P256SigningKey,
    verifying_key: P256VerifyingKey,
}

impl P256KeyPair {
    /// Generate a new random P-256 key pair.
    pub fn generate() -> Self {
        let signing_key = P256SigningKey::random(&mut rand::thread_rng());
        let verifying_key = *signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct a key pair from the 32-byte secret scalar.
    pub fn from_signing_key_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let signing_key = P256SigningKey::from_slice(bytes)
            .map_err(|e| MarkerError::InvalidKey(format!("invalid p256 scalar: {e}")))?;
        let verifying_key = *signing_key.verifying_key();
        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Return the verifying (public) key.
    pub fn verifying_key(&self) -> &P256VerifyingKey {
        &self.verifying_key
    }

    /// Return the secret scalar bytes. Caller must zeroize after use.
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.signing_key.to_bytes());
        out
    }

    /// Return the SEC1-compressed public key (33 bytes).
    pub fn verifying_key_bytes(&self) -> Vec<u8> {
        self.verifying_key.to_encoded_point(true).as_bytes().to_vec()
    }
}

impl Signer for P256KeyPair {
    fn algorithm(&self) -> Algorithm {
        Algorithm::P256
    }

    fn public_key(&self) -> Vec<u8> {
        self.verifying_key_bytes()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        use p256::ecdsa::signature::Signer as _;
        let signature: p256::ecdsa::Signature = self
            .signing_key
            .try_sign(message)
            .map_err(|e| MarkerError::Signing(format!("p256: {e}")))?;
        Ok(signature.to_bytes().to_vec())
    }
}

/// A key pair of either supported algorithm.
///
/// Used where the algorithm is only known at runtime, such as when loading
/// a key file.
pub enum KeyPair {
    Ed25519(Ed25519KeyPair),
    P256(P256KeyPair),
}

impl KeyPair {
    /// Generate a fresh key pair for `algorithm`.
    pub fn generate(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Ed25519 => Self::Ed25519(Ed25519KeyPair::generate()),
            Algorithm::P256 => Self::P256(P256KeyPair::generate()),
        }
    }

    /// Reconstruct from raw secret bytes.
    pub fn from_signing_key_bytes(algorithm: Algorithm, bytes: &[u8; 32]) -> Result<Self> {
        match algorithm {
            Algorithm::Ed25519 => Ok(Self::Ed25519(Ed25519KeyPair::from_signing_key_bytes(
                bytes,
            ))),
            Algorithm::P256 => Ok(Self::P256(P256KeyPair::from_signing_key_bytes(bytes)?)),
        }
    }

    /// Return the secret bytes. Caller must zeroize after use.
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        match self {
            Self::Ed25519(kp) => kp.signing_key_bytes(),
            Self::P256(kp) => kp.signing_key_bytes(),
        }
    }

    fn inner(&self) -> &dyn Signer {
        match self {
            Self::Ed25519(kp) => kp,
            Self::P256(kp) => kp,
        }
    }
}

impl Signer for KeyPair {
    fn algorithm(&self) -> Algorithm {
        self.inner().algorithm()
    }

    fn public_key(&self) -> Vec<u8> {
        self.inner().public_key()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.inner().sign(message)
    }
}
