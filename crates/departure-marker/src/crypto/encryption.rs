//! Passphrase sealing for signing keys at rest.
//!
//! passphrase → Argon2id(salt) → master key → HKDF-SHA256(context) →
//! ChaCha20-Poly1305 key. The KDF cost parameters travel with the sealed
//! blob so a file written under one setting still opens after the defaults
//! change.

use argon2::{Algorithm as Argon2Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::crypto::random::{random_nonce_12, random_salt_16};
use crate::error::{MarkerError, Result};

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Iterations.
    pub t_cost: u32,
    /// Parallel lanes.
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: 65536, // 64 MiB
            t_cost: 3,
            p_cost: 4,
        }
    }
}

/// Ciphertext plus everything except the passphrase needed to open it.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub kdf: KdfParams,
    pub salt: [u8; 16],
    pub nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
}

/// Derive a 32-byte key from a passphrase and salt using Argon2id.
pub fn derive_passphrase_key(
    passphrase: &[u8],
    salt: &[u8; 16],
    params: KdfParams,
) -> Result<Zeroizing<[u8; 32]>> {
    let params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(32))
        .map_err(|e| MarkerError::DerivationFailed(format!("Argon2 params: {e}")))?;
    let argon2 = Argon2::new(Argon2Algorithm::Argon2id, Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase, salt, &mut output[..])
        .map_err(|e| MarkerError::DerivationFailed(format!("Argon2 hash: {e}")))?;
    Ok(output)
}

/// Expand a master key into a purpose-bound subkey (HKDF-SHA256, RFC 5869).
pub fn expand_key(master: &[u8; 32], context: &str) -> Result<Zeroizing<[u8; 32]>> {
    let hk = Hkdf::<Sha256>::new(None, master);
    let mut output = Zeroizing::new([0u8; 32]);
    hk.expand(context.as_bytes(), &mut output[..])
        .map_err(|e| MarkerError::DerivationFailed(format!("HKDF expand failed: {e}")))?;
    Ok(output)
}

/// Encrypt `plaintext` under a passphrase, binding the key to `context`.
pub fn seal_with_passphrase(
    passphrase: &[u8],
    context: &str,
    plaintext: &[u8],
    kdf: KdfParams,
) -> Result<Sealed> {
    let salt = random_salt_16();
    let nonce = random_nonce_12();
    let key = data_key(passphrase, &salt, context, kdf)?;

    let cipher = ChaCha20Poly1305::new_from_slice(&key[..])
        .map_err(|e| MarkerError::EncryptionFailed(format!("cipher init: {e}")))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| MarkerError::EncryptionFailed(format!("encrypt: {e}")))?;

    Ok(Sealed {
        kdf,
        salt,
        nonce,
        ciphertext,
    })
}

/// Decrypt a sealed blob. A wrong passphrase or a tampered blob both fail
/// AEAD authentication and surface as `InvalidPassphrase`.
pub fn open_with_passphrase(
    passphrase: &[u8],
    context: &str,
    sealed: &Sealed,
) -> Result<Zeroizing<Vec<u8>>> {
    let key = data_key(passphrase, &sealed.salt, context, sealed.kdf)?;
    let cipher = ChaCha20Poly1305::new_from_slice(&key[..])
        .map_err(|e| MarkerError::DecryptionFailed(format!("cipher init: {e}")))?;
    cipher
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| MarkerError::InvalidPassphrase)
}

fn data_key(
    passphrase: &[u8],
    salt: &[u8; 16],
    context: &str,
    kdf: KdfParams,
) -> Result<Zeroizing<[u8; 32]>> {
    let master = derive_passphrase_key(passphrase, salt, kdf)?;
    expand_key(&master, context)
}
