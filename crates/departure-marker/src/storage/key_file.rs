//! `.dmk` key files: signing keys encrypted at rest.
//!
//! The secret scalars are sealed with ChaCha20-Poly1305 under a key derived
//! from a passphrase (Argon2id, then HKDF-SHA256). The DID and algorithm are
//! stored in plaintext so a key can be identified without the passphrase.
//!
//! File format (JSON):
//! ```json
//! {
//!     "version": 1,
//!     "format": "dmk-v1",
//!     "algorithm": "ed25519",
//!     "did": "did:key:z6Mk...",
//!     "nextKeyDigest": "<hex, present when a pre-rotated key is stored>",
//!     "encryption": {
//!         "cipher": "chacha20-poly1305",
//!         "kdf": "argon2id",
//!         "kdfParams": { "m_cost": 65536, "t_cost": 3, "p_cost": 4 },
//!         "salt": "<base64-16-bytes>",
//!         "nonce": "<base64-12-bytes>"
//!     },
//!     "ciphertext": "<base64>"
//! }
//! ```

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::crypto::encryption::{open_with_passphrase, seal_with_passphrase, KdfParams, Sealed};
use crate::crypto::{Algorithm, KeyPair, Signer};
use crate::error::{MarkerError, Result};
use crate::keylog::key_digest;

const KEY_FILE_VERSION: u32 = 1;
const KEY_FILE_FORMAT: &str = "dmk-v1";
const KEY_FILE_CIPHER: &str = "chacha20-poly1305";
const KEY_FILE_KDF: &str = "argon2id";

/// HKDF context binding the data key to this file format. Must not change.
const KEY_FILE_CONTEXT: &str = "departure-marker/key-file";

/// On-disk structure.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFile {
    pub version: u32,
    pub format: String,
    pub algorithm: Algorithm,
    pub did: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_key_digest: Option<String>,
    pub encryption: EncryptionMetadata,
    pub ciphertext: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionMetadata {
    pub cipher: String,
    pub kdf: String,
    pub kdf_params: KdfParams,
    pub salt: String,
    pub nonce: String,
}

/// Sealed payload.
#[derive(Serialize, Deserialize, Zeroize)]
#[serde(rename_all = "camelCase")]
struct KeyMaterial {
    signing_key: String,
    #[serde(default)]
    next_signing_key: Option<String>,
}

/// Keys held by a key file: the current signer and, for pre-rotated
/// identities, the reserved next signer.
pub struct StoredKeys {
    pub current: KeyPair,
    pub next: Option<KeyPair>,
}

impl StoredKeys {
    pub fn single(current: KeyPair) -> Self {
        Self {
            current,
            next: None,
        }
    }
}

/// Encrypt and write `keys` to `path`.
///
/// The write goes to a sibling temp file first and is renamed into place.
pub fn save_keys(path: &Path, keys: &StoredKeys, passphrase: &str, kdf: KdfParams) -> Result<()> {
    if let Some(next) = &keys.next {
        if next.algorithm() != keys.current.algorithm() {
            return Err(MarkerError::InvalidKey(
                "current and next keys must share an algorithm".into(),
            ));
        }
    }

    let mut material = KeyMaterial {
        signing_key: encode_secret(&keys.current),
        next_signing_key: keys.next.as_ref().map(encode_secret),
    };
    let mut plaintext = serde_json::to_vec(&material)?;
    material.zeroize();

    let sealed = seal_with_passphrase(passphrase.as_bytes(), KEY_FILE_CONTEXT, &plaintext, kdf);
    plaintext.zeroize();
    let sealed = sealed?;

    let file = KeyFile {
        version: KEY_FILE_VERSION,
        format: KEY_FILE_FORMAT.to_string(),
        algorithm: keys.current.algorithm(),
        did: keys.current.did(),
        next_key_digest: keys.next.as_ref().map(|n| key_digest(&n.did())),
        encryption: EncryptionMetadata {
            cipher: KEY_FILE_CIPHER.to_string(),
            kdf: KEY_FILE_KDF.to_string(),
            kdf_params: sealed.kdf,
            salt: STANDARD.encode(sealed.salt),
            nonce: STANDARD.encode(sealed.nonce),
        },
        ciphertext: STANDARD.encode(&sealed.ciphertext),
    };

    let json = serde_json::to_string_pretty(&file)?;
    write_atomic(path, json.as_bytes())?;
    log::debug!("saved {} key {} to {}", file.algorithm, file.did, path.display());
    Ok(())
}

/// Read and decrypt a key file.
pub fn load_keys(path: &Path, passphrase: &str) -> Result<StoredKeys> {
    let file = read_key_file(path)?;

    let salt: [u8; 16] = decode_field("salt", &file.encryption.salt)?
        .try_into()
        .map_err(|_| MarkerError::InvalidFileFormat("salt must be 16 bytes".into()))?;
    let nonce: [u8; 12] = decode_field("nonce", &file.encryption.nonce)?
        .try_into()
        .map_err(|_| MarkerError::InvalidFileFormat("nonce must be 12 bytes".into()))?;
    let sealed = Sealed {
        kdf: file.encryption.kdf_params,
        salt,
        nonce,
        ciphertext: decode_field("ciphertext", &file.ciphertext)?,
    };

    let plaintext = open_with_passphrase(passphrase.as_bytes(), KEY_FILE_CONTEXT, &sealed)?;
    let mut material: KeyMaterial = serde_json::from_slice(&plaintext)
        .map_err(|e| MarkerError::InvalidFileFormat(format!("sealed key material: {e}")))?;

    let current = decode_secret(file.algorithm, &material.signing_key);
    let next = material
        .next_signing_key
        .as_deref()
        .map(|s| decode_secret(file.algorithm, s))
        .transpose();
    material.zeroize();
    let keys = StoredKeys {
        current: current?,
        next: next?,
    };

    if keys.current.did() != file.did {
        return Err(MarkerError::InvalidFileFormat(
            "decrypted key does not match the recorded DID".into(),
        ));
    }
    Ok(keys)
}

/// Read the plaintext header without the passphrase.
pub fn read_key_file(path: &Path) -> Result<KeyFile> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            MarkerError::NotFound(format!("key file {}", path.display()))
        }
        _ => MarkerError::Io(e),
    })?;
    let file: KeyFile = serde_json::from_slice(&bytes)
        .map_err(|e| MarkerError::InvalidFileFormat(format!("failed to parse key file: {e}")))?;
    if file.version != KEY_FILE_VERSION || file.format != KEY_FILE_FORMAT {
        return Err(MarkerError::InvalidFileFormat(format!(
            "unsupported key file version={} format={}",
            file.version, file.format
        )));
    }
    Ok(file)
}

fn encode_secret(key: &KeyPair) -> String {
    let mut bytes = key.signing_key_bytes();
    let encoded = STANDARD.encode(bytes);
    bytes.zeroize();
    encoded
}

fn decode_secret(algorithm: Algorithm, encoded: &str) -> Result<KeyPair> {
    let mut bytes = STANDARD
        .decode(encoded)
        .map_err(|e| MarkerError::InvalidKey(format!("invalid signing key base64: {e}")))?;
    let result = match <[u8; 32]>::try_from(bytes.as_slice()) {
        Ok(mut arr) => {
            let key = KeyPair::from_signing_key_bytes(algorithm, &arr);
            arr.zeroize();
            key
        }
        Err(_) => Err(MarkerError::InvalidKey("signing key must be 32 bytes".into())),
    };
    bytes.zeroize();
    result
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| MarkerError::InvalidFileFormat(format!("invalid {name} base64: {e}")))
}

/// Write `data` to `path` via a sibling temp file and a rename, so readers
/// never see a partial file.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
