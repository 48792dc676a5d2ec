//! An identity that always holds its next key in reserve.

use crate::crypto::{Algorithm, KeyPair, Signer};
use crate::error::Result;

use super::event::{key_digest, RotationReason};
use super::event_log::KeyEventLog;
use super::state::KeyState;

/// Current signer, committed next signer, and the log binding them.
///
/// Only the digest of `next` is published until the rotation that
/// activates it.
pub struct PreRotatedIdentity {
    algorithm: Algorithm,
    current: KeyPair,
    next: KeyPair,
    log: KeyEventLog,
}

impl PreRotatedIdentity {
    /// Generate both keys and incept a log.
    pub fn generate(algorithm: Algorithm) -> Result<Self> {
        let current = KeyPair::generate(algorithm);
        let next = KeyPair::generate(algorithm);
        Self::from_parts(current, next)
    }

    /// Incept a log for existing keys.
    pub fn from_parts(current: KeyPair, next: KeyPair) -> Result<Self> {
        let log = KeyEventLog::incept(&current, &[next.did()])?;
        Ok(Self {
            algorithm: current.algorithm(),
            current,
            next,
            log,
        })
    }

    /// Reattach keys to a previously persisted log. The log must list
    /// `current` as authorized and commit to `next`.
    pub fn resume(log: KeyEventLog, current: KeyPair, next: KeyPair) -> Result<Self> {
        use crate::error::KeyLogViolation;
        let state = log.state();
        let sequence = state.sequence;
        if !state.keys.contains(&current.did()) {
            return Err(KeyLogViolation::UnauthorizedSigner {
                sequence,
                signer: current.did(),
            }
            .into());
        }
        if !state.next_key_digests.contains(&key_digest(&next.did())) {
            return Err(KeyLogViolation::UncommittedKey {
                sequence,
                key: next.did(),
            }
            .into());
        }
        Ok(Self {
            algorithm: current.algorithm(),
            current,
            next,
            log,
        })
    }

    /// Activate the committed key and commit to a freshly generated one.
    pub fn rotate(&mut self, reason: Option<RotationReason>) -> Result<&KeyState> {
        let after = KeyPair::generate(self.algorithm);
        let event = self.log.rotate_event_with_reason(
            &self.current,
            &[self.next.did()],
            &[key_digest(&after.did())],
            reason,
        )?;
        self.log.append(event)?;
        self.current = std::mem::replace(&mut self.next, after);
        Ok(self.log.state())
    }

    pub fn signer(&self) -> &KeyPair {
        &self.current
    }

    /// The reserved key. Callers persisting an identity need it; it must not
    /// be used to sign before it is rotated in.
    pub fn next_signer(&self) -> &KeyPair {
        &self.next
    }

    pub fn did(&self) -> String {
        self.current.did()
    }

    pub fn identifier(&self) -> &str {
        self.log.identifier()
    }

    pub fn log(&self) -> &KeyEventLog {
        &self.log
    }

    pub fn into_log(self) -> KeyEventLog {
        self.log
    }

    /// Split into `(current, next, log)` for persisting.
    pub fn into_parts(self) -> (KeyPair, KeyPair, KeyEventLog) {
        (self.current, self.next, self.log)
    }
}
