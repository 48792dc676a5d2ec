//! Secure random bytes from the thread-local CSPRNG (seeded by the OS).
//!
//! Key generation draws from the same source through `rand::thread_rng()`.

use rand::RngCore;

/// Generate a fixed-size array of cryptographically secure random bytes.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

/// 12-byte ChaCha20-Poly1305 nonce.
pub fn random_nonce_12() -> [u8; 12] {
    random_bytes()
}

/// 16-byte Argon2id salt.
pub fn random_salt_16() -> [u8; 16] {
    random_bytes()
}
