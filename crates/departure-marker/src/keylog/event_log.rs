//! The verified, append-only key event log.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::crypto::{PublicKey, Signer};
use crate::error::{KeyLogViolation, Result};
use crate::marker::validate::is_hex_digest;
use crate::proof::domain;

use super::event::{
    inception_identifier, key_digest, InceptionEvent, KeyEvent, RotationEvent, RotationReason,
};
use super::state::{contains_key, KeyState};

/// Replay a full log from its inception. Any violation rejects the whole log.
pub fn verify_key_state(events: &[KeyEvent]) -> Result<KeyState> {
    let (first, rest) = events.split_first().ok_or(KeyLogViolation::EmptyLog)?;
    let mut state = apply(None, first)?;
    for event in rest {
        state = apply(Some(&state), event)?;
    }
    Ok(state)
}

/// Check one event against the state it extends and return the new state.
fn apply(prior: Option<&KeyState>, event: &KeyEvent) -> Result<KeyState> {
    let sequence = event.sequence();
    match (prior, event) {
        (None, KeyEvent::Rotation(_)) => Err(KeyLogViolation::MissingInception.into()),
        (Some(_), KeyEvent::Inception(_)) => {
            Err(KeyLogViolation::DuplicateInception(sequence).into())
        }
        (None, KeyEvent::Inception(inception)) => {
            if sequence != 0 {
                return Err(KeyLogViolation::SequenceGap {
                    expected: 0,
                    actual: sequence,
                }
                .into());
            }
            check_key_sets(event)?;
            let identifier = inception_identifier(inception)?;
            if inception.identifier != identifier {
                return Err(KeyLogViolation::IdentifierMismatch {
                    expected: identifier,
                    actual: inception.identifier.clone(),
                }
                .into());
            }
            check_signature(event, &inception.keys)?;
            Ok(KeyState {
                identifier,
                sequence: 0,
                keys: inception.keys.clone(),
                next_key_digests: inception.next_key_digests.clone(),
                last_event_digest: event.digest()?,
                retired: Default::default(),
            })
        }
        (Some(state), KeyEvent::Rotation(rotation)) => {
            if sequence != state.sequence + 1 {
                return Err(KeyLogViolation::SequenceGap {
                    expected: state.sequence + 1,
                    actual: sequence,
                }
                .into());
            }
            if rotation.identifier != state.identifier {
                return Err(KeyLogViolation::IdentifierMismatch {
                    expected: state.identifier.clone(),
                    actual: rotation.identifier.clone(),
                }
                .into());
            }
            if rotation.prior_event_digest != state.last_event_digest {
                return Err(KeyLogViolation::PriorDigestMismatch { sequence }.into());
            }
            check_key_sets(event)?;
            for key in &rotation.keys {
                if !state.next_key_digests.contains(&key_digest(key)) {
                    return Err(KeyLogViolation::UncommittedKey {
                        sequence,
                        key: key.clone(),
                    }
                    .into());
                }
            }
            // authority comes from the prior state, not from the event itself
            check_signature(event, &state.keys)?;

            let mut retired = state.retired.clone();
            for old in &state.keys {
                if !rotation.keys.contains(old) {
                    retired.insert(old.clone(), sequence);
                }
            }
            Ok(KeyState {
                identifier: state.identifier.clone(),
                sequence,
                keys: rotation.keys.clone(),
                next_key_digests: rotation.next_key_digests.clone(),
                last_event_digest: event.digest()?,
                retired,
            })
        }
    }
}

fn check_key_sets(event: &KeyEvent) -> Result<()> {
    let sequence = event.sequence();
    if event.keys().is_empty() {
        return Err(KeyLogViolation::EmptyKeySet { sequence }.into());
    }
    for key in event.keys() {
        if let Err(e) = PublicKey::from_did(key) {
            return Err(KeyLogViolation::Malformed {
                sequence,
                reason: format!("key {key}: {e}"),
            }
            .into());
        }
    }
    if let Some(bad) = event.next_key_digests().iter().find(|d| !is_hex_digest(d)) {
        return Err(KeyLogViolation::Malformed {
            sequence,
            reason: format!("next key digest '{bad}' is not a SHA-256 hex digest"),
        }
        .into());
    }
    Ok(())
}

fn check_signature(event: &KeyEvent, authorized: &[String]) -> Result<()> {
    let sequence = event.sequence();
    let proof = event.proof();
    let body = event.signing_body()?;
    let (key, failures) = proof.check(domain::KEY_EVENT, body.as_bytes());

    let Some(key) = key else {
        return Err(KeyLogViolation::InvalidSignature { sequence }.into());
    };
    if !contains_key(authorized, &key) {
        return Err(KeyLogViolation::UnauthorizedSigner {
            sequence,
            signer: key.to_did(),
        }
        .into());
    }
    if !failures.is_empty() {
        return Err(KeyLogViolation::InvalidSignature { sequence }.into());
    }
    Ok(())
}

/// An append-only key event log with its verified state cached.
#[derive(Debug, Clone)]
pub struct KeyEventLog {
    events: Vec<KeyEvent>,
    state: KeyState,
}

impl KeyEventLog {
    /// Start a log with `signer` as the sole current key, committing to
    /// `next_key_dids` for the first rotation.
    pub fn incept(signer: &dyn Signer, next_key_dids: &[String]) -> Result<Self> {
        let digests = next_key_dids.iter().map(String::as_str).map(key_digest).collect();
        Self::incept_with_digests(signer, digests)
    }

    /// Start a log committing to already-hashed next keys.
    pub fn incept_with_digests(signer: &dyn Signer, next_key_digests: Vec<String>) -> Result<Self> {
        let mut inception = InceptionEvent {
            identifier: String::new(),
            sequence: 0,
            keys: vec![signer.did()],
            next_key_digests,
            created: crate::time::now_rfc3339(),
            proof: Default::default(),
        };
        inception.identifier = inception_identifier(&inception)?;
        inception.sign(signer)?;

        let log = Self::from_events(vec![KeyEvent::Inception(inception)])?;
        log::debug!("incepted key log {}", log.state.identifier);
        Ok(log)
    }

    /// Replay and adopt a full event list.
    pub fn from_events(events: Vec<KeyEvent>) -> Result<Self> {
        let state = verify_key_state(&events)?;
        Ok(Self { events, state })
    }

    /// Build and sign the next rotation without appending it.
    pub fn rotate_event(
        &self,
        current_signer: &dyn Signer,
        new_keys: &[String],
        next_key_digests: &[String],
    ) -> Result<RotationEvent> {
        self.rotate_event_with_reason(current_signer, new_keys, next_key_digests, None)
    }

    pub fn rotate_event_with_reason(
        &self,
        current_signer: &dyn Signer,
        new_keys: &[String],
        next_key_digests: &[String],
        reason: Option<RotationReason>,
    ) -> Result<RotationEvent> {
        let mut event = RotationEvent {
            identifier: self.state.identifier.clone(),
            sequence: self.state.sequence + 1,
            prior_event_digest: self.state.last_event_digest.clone(),
            keys: new_keys.to_vec(),
            next_key_digests: next_key_digests.to_vec(),
            reason,
            created: crate::time::now_rfc3339(),
            proof: Default::default(),
        };
        event.sign(current_signer)?;
        Ok(event)
    }

    /// Verify `event` against the cached state and append it.
    ///
    /// Only the new event is checked. On error the log is unchanged.
    pub fn append(&mut self, event: RotationEvent) -> Result<&KeyState> {
        self.append_event(KeyEvent::Rotation(event))
    }

    pub fn append_event(&mut self, event: KeyEvent) -> Result<&KeyState> {
        match apply(Some(&self.state), &event) {
            Ok(state) => {
                log::debug!(
                    "key log {} advanced to sequence {}",
                    state.identifier,
                    state.sequence
                );
                self.state = state;
                self.events.push(event);
                Ok(&self.state)
            }
            Err(e) => {
                log::warn!("key log {} rejected event: {e}", self.state.identifier);
                Err(e)
            }
        }
    }

    pub fn events(&self) -> &[KeyEvent] {
        &self.events
    }

    pub fn state(&self) -> &KeyState {
        &self.state
    }

    pub fn identifier(&self) -> &str {
        &self.state.identifier
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always false: a log holds at least its inception.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// A key event log shared between threads. Appends are serialized, so two
/// rotations built on the same prior event cannot both land.
#[derive(Debug, Clone)]
pub struct SharedKeyEventLog {
    inner: Arc<Mutex<KeyEventLog>>,
}

impl SharedKeyEventLog {
    pub fn new(log: KeyEventLog) -> Self {
        Self {
            inner: Arc::new(Mutex::new(log)),
        }
    }

    pub fn append(&self, event: RotationEvent) -> Result<KeyState> {
        let mut log = self.lock();
        log.append(event).cloned()
    }

    pub fn state(&self) -> KeyState {
        self.lock().state().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current log.
    pub fn snapshot(&self) -> KeyEventLog {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, KeyEventLog> {
        // appends either fully land or leave the log untouched, so a poisoned
        // lock still guards a consistent log
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
