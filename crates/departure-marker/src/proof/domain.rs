//! Domain-separation prefixes.
//!
//! Each signature purpose prepends its own prefix to the canonical bytes, so
//! a signature made for one purpose never verifies for another. No prefix is
//! a prefix of another.

pub const INTENT: &[u8] = b"departure-marker/v1/intent\n";
pub const MARKER: &[u8] = b"departure-marker/v1/marker\n";
pub const WITNESS: &[u8] = b"departure-marker/v1/witness\n";
pub const KEY_EVENT: &[u8] = b"departure-marker/v1/key-event\n";
pub const BATCH: &[u8] = b"departure-marker/v1/batch\n";

pub const ALL: [&[u8]; 5] = [INTENT, MARKER, WITNESS, KEY_EVENT, BATCH];

/// `domain ‖ body`.
pub fn separate(domain: &[u8], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(domain.len() + body.len());
    out.extend_from_slice(domain);
    out.extend_from_slice(body);
    out
}
