//! Cryptographic primitives.
//!
//! This module provides:
//! - the closed [`Algorithm`] set (Ed25519, P-256) and its proof-type tags
//! - the [`Signer`] capability and the [`PublicKey`] verifier
//! - Ed25519 and P-256 key pairs, which implement `Signer` directly
//! - `did:key` and multibase encoding
//! - Argon2id + HKDF-SHA256 passphrase sealing with ChaCha20-Poly1305
//!   (used for key files at rest)
//! - cryptographically secure random number generation

pub mod algorithm;
pub mod did;
pub mod encryption;
pub mod keys;
pub mod random;
pub mod signing;

pub use algorithm::Algorithm;
pub use did::{decode_did, decode_multibase, encode_did, encode_multibase, is_did};
pub use keys::{Ed25519KeyPair, KeyPair, P256KeyPair};
pub use signing::{verify_signature, PublicKey, Signer};
