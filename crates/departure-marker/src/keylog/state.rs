//! Materialized key state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;
use crate::marker::DepartureMarker;

/// Result of replaying a key event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyState {
    pub identifier: String,
    pub sequence: u64,
    pub keys: Vec<String>,
    pub next_key_digests: Vec<String>,
    pub last_event_digest: String,
    /// Rotated-out keys and the sequence of the rotation that removed them.
    pub retired: BTreeMap<String, u64>,
}

/// Where a key stands in a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Current,
    Retired { at_sequence: u64 },
    Unknown,
}

impl KeyState {
    pub fn key_status(&self, did: &str) -> KeyStatus {
        let Ok(key) = PublicKey::from_did(did) else {
            return KeyStatus::Unknown;
        };
        if contains_key(&self.keys, &key) {
            return KeyStatus::Current;
        }
        self.retired
            .iter()
            .find(|(retired, _)| PublicKey::from_did(retired).is_ok_and(|k| k == key))
            .map(|(_, &at_sequence)| KeyStatus::Retired { at_sequence })
            .unwrap_or(KeyStatus::Unknown)
    }

    pub fn is_current(&self, key: &PublicKey) -> bool {
        contains_key(&self.keys, key)
    }
}

/// Whether the key that signed `marker` is outside the current authorized
/// set. An undecodable verification method counts as compromised.
pub fn is_key_compromised(state: &KeyState, marker: &DepartureMarker) -> bool {
    match PublicKey::from_did(&marker.proof.verification_method) {
        Ok(key) => !state.is_current(&key),
        Err(_) => true,
    }
}

pub(crate) fn contains_key(dids: &[String], key: &PublicKey) -> bool {
    dids.iter()
        .any(|did| PublicKey::from_did(did).is_ok_and(|k| k == *key))
}
