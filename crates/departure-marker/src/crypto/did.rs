//! `did:key` and multibase encoding.
//!
//! A DID is `did:key:z` followed by base58btc of the multicodec prefix and
//! the raw public key. The algorithm is recoverable from the prefix alone.

use crate::error::{MarkerError, Result};

use super::algorithm::Algorithm;

pub const DID_KEY_PREFIX: &str = "did:key:";
const MULTIBASE_BASE58BTC: char = 'z';

/// Encode a public key as a `did:key`.
pub fn encode_did(algorithm: Algorithm, public_key: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(2 + public_key.len());
    bytes.extend_from_slice(&algorithm.multicodec_prefix());
    bytes.extend_from_slice(public_key);
    format!("{DID_KEY_PREFIX}{}", encode_multibase(&bytes))
}

/// Decode a `did:key` (optionally with a `#fragment`) into its algorithm
/// and raw public key bytes.
pub fn decode_did(did: &str) -> Result<(Algorithm, Vec<u8>)> {
    let did = did.split('#').next().unwrap_or_default();
    let encoded = did
        .strip_prefix(DID_KEY_PREFIX)
        .ok_or_else(|| MarkerError::InvalidDid(format!("not a did:key: '{did}'")))?;

    let bytes = decode_multibase(encoded)
        .map_err(|e| MarkerError::InvalidDid(format!("'{did}': {e}")))?;

    let algorithm = Algorithm::from_multicodec(&bytes).ok_or_else(|| {
        let prefix: Vec<u8> = bytes.iter().take(2).copied().collect();
        MarkerError::UnknownMulticodec(hex::encode(prefix))
    })?;

    let key = bytes[2..].to_vec();
    if key.len() != algorithm.public_key_len() {
        return Err(MarkerError::InvalidKey(format!(
            "{algorithm} key must be {} bytes, got {}",
            algorithm.public_key_len(),
            key.len()
        )));
    }
    Ok((algorithm, key))
}

/// Whether a string is DID-shaped (`did:<method>:...`).
pub fn is_did(s: &str) -> bool {
    s.starts_with("did:") && s.len() > 4
}

/// Multibase base58btc encoding (`z` prefix).
pub fn encode_multibase(bytes: &[u8]) -> String {
    format!("{MULTIBASE_BASE58BTC}{}", bs58::encode(bytes).into_string())
}

/// Decode a multibase base58btc string.
pub fn decode_multibase(s: &str) -> Result<Vec<u8>> {
    let body = s.strip_prefix(MULTIBASE_BASE58BTC).ok_or_else(|| {
        MarkerError::InvalidDid("unsupported multibase encoding (expected 'z')".into())
    })?;
    bs58::decode(body)
        .into_vec()
        .map_err(|e| MarkerError::InvalidDid(format!("invalid base58btc: {e}")))
}
