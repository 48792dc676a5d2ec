//! The departure ceremony.
//!
//! One machine per departure attempt. Every operation checks the transition
//! table before doing any work, so a rejected call leaves the machine as it
//! was.

use std::sync::Arc;

use crate::crypto::Signer;
use crate::error::{MarkerError, Result};
use crate::marker::{DepartureMarker, DepartureType};
use crate::proof::{self, DepartureIntent, SignedIntent, WitnessAttestation};
use crate::telemetry::{NoopTelemetry, Outcome, Telemetry, TelemetryEvent};

use super::state::{valid_transitions, CeremonyPath, CeremonyState};

pub struct CeremonyStateMachine {
    state: CeremonyState,
    intent: Option<SignedIntent>,
    intended_type: Option<DepartureType>,
    signed: Option<DepartureMarker>,
    witnesses: Vec<WitnessAttestation>,
    path: Option<CeremonyPath>,
    history: Vec<CeremonyState>,
    telemetry: Arc<dyn Telemetry>,
}

impl Default for CeremonyStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CeremonyStateMachine {
    pub fn new() -> Self {
        Self::with_telemetry(Arc::new(NoopTelemetry))
    }

    pub fn with_telemetry(telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            state: CeremonyState::Alive,
            intent: None,
            intended_type: None,
            signed: None,
            witnesses: Vec::new(),
            path: None,
            history: vec![CeremonyState::Alive],
            telemetry,
        }
    }

    pub fn state(&self) -> CeremonyState {
        self.state
    }

    /// States visited so far, starting with `Alive`.
    pub fn history(&self) -> &[CeremonyState] {
        &self.history
    }

    /// The route taken to `Final`, once signed.
    pub fn path(&self) -> Option<CeremonyPath> {
        self.path
    }

    pub fn intent(&self) -> Option<&SignedIntent> {
        self.intent.as_ref()
    }

    pub fn signed_marker(&self) -> Option<&DepartureMarker> {
        self.signed.as_ref()
    }

    pub fn witnesses(&self) -> &[WitnessAttestation] {
        &self.witnesses
    }

    /// Sign and record an intent to depart.
    ///
    /// A non-emergency intent moves `Alive` to `Intent`. An emergency intent
    /// only records the type, leaving the machine where it is so that
    /// `sign_marker` can go straight to `Final`.
    pub fn declare_intent(
        &mut self,
        subject: &str,
        origin: &str,
        departure_type: DepartureType,
        signer: &dyn Signer,
    ) -> Result<SignedIntent> {
        self.ensure_live("declare_intent", CeremonyState::Intent)?;

        let emergency = departure_type == DepartureType::Emergency;
        if emergency {
            if !matches!(self.state, CeremonyState::Alive | CeremonyState::Intent) {
                return Err(self.illegal(CeremonyState::Intent));
            }
        } else {
            self.check_transition(CeremonyState::Intent)?;
        }

        let intent = DepartureIntent::new(subject, origin, departure_type);
        let signed = proof::sign_intent(intent, signer);
        self.report("declare_intent", signer, None, &signed);
        let signed = signed?;

        if !emergency {
            self.enter(CeremonyState::Intent);
        }
        self.intended_type = Some(departure_type);
        self.intent = Some(signed.clone());
        Ok(signed)
    }

    pub fn snapshot(&mut self) -> Result<()> {
        self.ensure_live("snapshot", CeremonyState::Snapshot)?;
        self.advance(CeremonyState::Snapshot)
    }

    /// Open the challenge window.
    pub fn open_challenge(&mut self) -> Result<()> {
        self.ensure_live("open_challenge", CeremonyState::Open)?;
        self.advance(CeremonyState::Open)
    }

    pub fn contest(&mut self) -> Result<()> {
        self.ensure_live("contest", CeremonyState::Contested)?;
        self.advance(CeremonyState::Contested)
    }

    /// Sign the marker as its subject and move to `Final`.
    pub fn sign_marker(
        &mut self,
        marker: &DepartureMarker,
        signer: &dyn Signer,
    ) -> Result<DepartureMarker> {
        self.ensure_live("sign_marker", CeremonyState::Final)?;
        self.check_transition(CeremonyState::Final)?;

        let path = match self.state {
            CeremonyState::Snapshot => CeremonyPath::Cooperative,
            CeremonyState::Open => CeremonyPath::Unilateral,
            CeremonyState::Contested => CeremonyPath::Contested,
            CeremonyState::Alive | CeremonyState::Intent => {
                if marker.departure_type != DepartureType::Emergency {
                    return Err(MarkerError::EmergencyPathRequired { state: self.state });
                }
                CeremonyPath::Emergency
            }
            CeremonyState::Final | CeremonyState::Departed => {
                return Err(self.illegal(CeremonyState::Final))
            }
        };

        if let Some(declared) = self.intended_type {
            if declared != marker.departure_type {
                return Err(MarkerError::DepartureTypeMismatch {
                    declared: declared.to_string(),
                    actual: marker.departure_type.to_string(),
                });
            }
        }

        let signed = proof::sign_marker(marker, signer);
        let id = signed.as_ref().ok().map(|m| m.id.clone());
        self.report("sign_marker", signer, id, &signed);
        let signed = signed?;

        self.enter(CeremonyState::Final);
        self.path = Some(path);
        self.signed = Some(signed.clone());
        Ok(signed)
    }

    /// Co-sign the finalized marker as a witness.
    pub fn witness(&mut self, signer: &dyn Signer) -> Result<WitnessAttestation> {
        self.ensure_live("witness", CeremonyState::Final)?;
        if self.state != CeremonyState::Final {
            return Err(MarkerError::NotFinal {
                operation: "witness".into(),
                state: self.state,
            });
        }
        let marker = self.signed.as_ref().ok_or(MarkerError::NoSignedMarker)?;

        let attestation = proof::witness_marker(marker, signer);
        self.report("witness", signer, Some(marker.id.clone()), &attestation);
        let attestation = attestation?;

        self.witnesses.push(attestation.clone());
        Ok(attestation)
    }

    /// Close the ceremony and hand back the finalized marker.
    pub fn depart(&mut self) -> Result<DepartureMarker> {
        self.ensure_live("depart", CeremonyState::Departed)?;
        self.check_transition(CeremonyState::Departed)?;
        let marker = self.signed.clone().ok_or(MarkerError::NoSignedMarker)?;
        self.enter(CeremonyState::Departed);
        Ok(marker)
    }

    fn ensure_live(&self, operation: &str, to: CeremonyState) -> Result<()> {
        if self.state.is_terminal() {
            return Err(MarkerError::TerminalState {
                operation: operation.to_string(),
                from: self.state,
                to,
                legal: valid_transitions(self.state).to_vec(),
            });
        }
        Ok(())
    }

    fn check_transition(&self, to: CeremonyState) -> Result<()> {
        if self.state.can_transition_to(to) {
            Ok(())
        } else {
            Err(self.illegal(to))
        }
    }

    fn advance(&mut self, to: CeremonyState) -> Result<()> {
        self.check_transition(to)?;
        self.enter(to);
        Ok(())
    }

    fn enter(&mut self, to: CeremonyState) {
        log::debug!("ceremony {} -> {}", self.state, to);
        self.state = to;
        self.history.push(to);
    }

    fn illegal(&self, to: CeremonyState) -> MarkerError {
        MarkerError::IllegalTransition {
            from: self.state,
            to,
            legal: valid_transitions(self.state).to_vec(),
        }
    }

    fn report<T>(
        &self,
        operation: &'static str,
        signer: &dyn Signer,
        marker_id: Option<String>,
        result: &Result<T>,
    ) {
        let outcome = match result {
            Ok(_) => Outcome::Success,
            Err(e) => Outcome::Failure(e.to_string()),
        };
        let mut event = TelemetryEvent::new(operation, outcome)
            .algorithm(signer.algorithm())
            .did(signer.did());
        event.marker_id = marker_id;
        self.telemetry.record(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Ed25519KeyPair, P256KeyPair};
    use crate::marker::MarkerBuilder;
    use crate::proof::{verify_marker, verify_witness};
    use crate::telemetry::MemoryTelemetry;

    const ORIGIN: &str = "https://platform.example";

    fn marker_for(signer: &dyn Signer, t: DepartureType) -> DepartureMarker {
        let mut b = MarkerBuilder::new(signer.did(), ORIGIN, t);
        if t == DepartureType::Emergency {
            b = b.emergency_justification("platform compromised");
        }
        b.build().unwrap()
    }

    #[test]
    fn test_cooperative_path() {
        let kp = Ed25519KeyPair::generate();
        let mut c = CeremonyStateMachine::new();
        c.declare_intent(&kp.did(), ORIGIN, DepartureType::Voluntary, &kp)
            .unwrap();
        c.snapshot().unwrap();
        let signed = c
            .sign_marker(&marker_for(&kp, DepartureType::Voluntary), &kp)
            .unwrap();
        assert!(verify_marker(&signed).valid);
        assert_eq!(c.path(), Some(CeremonyPath::Cooperative));
        let departed = c.depart().unwrap();
        assert_eq!(departed, signed);
        assert_eq!(
            c.history(),
            &[
                CeremonyState::Alive,
                CeremonyState::Intent,
                CeremonyState::Snapshot,
                CeremonyState::Final,
                CeremonyState::Departed
            ]
        );
    }

    #[test]
    fn test_unilateral_and_contested_paths() {
        let kp = P256KeyPair::generate();
        let mut c = CeremonyStateMachine::new();
        c.declare_intent(&kp.did(), ORIGIN, DepartureType::Forced, &kp)
            .unwrap();
        c.snapshot().unwrap();
        c.open_challenge().unwrap();
        c.sign_marker(&marker_for(&kp, DepartureType::Forced), &kp)
            .unwrap();
        assert_eq!(c.path(), Some(CeremonyPath::Unilateral));

        let mut c = CeremonyStateMachine::new();
        c.declare_intent(&kp.did(), ORIGIN, DepartureType::Forced, &kp)
            .unwrap();
        c.snapshot().unwrap();
        c.open_challenge().unwrap();
        c.contest().unwrap();
        c.sign_marker(&marker_for(&kp, DepartureType::Forced), &kp)
            .unwrap();
        assert_eq!(c.path(), Some(CeremonyPath::Contested));
    }

    #[test]
    fn test_emergency_from_alive() {
        let kp = Ed25519KeyPair::generate();
        let mut c = CeremonyStateMachine::new();
        c.declare_intent(&kp.did(), ORIGIN, DepartureType::Emergency, &kp)
            .unwrap();
        assert_eq!(c.state(), CeremonyState::Alive);
        c.sign_marker(&marker_for(&kp, DepartureType::Emergency), &kp)
            .unwrap();
        assert_eq!(c.state(), CeremonyState::Final);
        assert_eq!(c.path(), Some(CeremonyPath::Emergency));
    }

    #[test]
    fn test_emergency_escalation_after_intent() {
        let kp = Ed25519KeyPair::generate();
        let mut c = CeremonyStateMachine::new();
        c.declare_intent(&kp.did(), ORIGIN, DepartureType::Voluntary, &kp)
            .unwrap();
        c.declare_intent(&kp.did(), ORIGIN, DepartureType::Emergency, &kp)
            .unwrap();
        assert_eq!(c.state(), CeremonyState::Intent);
        c.sign_marker(&marker_for(&kp, DepartureType::Emergency), &kp)
            .unwrap();
        assert_eq!(c.path(), Some(CeremonyPath::Emergency));
    }

    #[test]
    fn test_non_emergency_shortcut_rejected() {
        let kp = Ed25519KeyPair::generate();
        let mut c = CeremonyStateMachine::new();
        let err = c
            .sign_marker(&marker_for(&kp, DepartureType::Voluntary), &kp)
            .unwrap_err();
        assert!(matches!(
            err,
            MarkerError::EmergencyPathRequired {
                state: CeremonyState::Alive
            }
        ));
        assert_eq!(c.state(), CeremonyState::Alive);
    }

    #[test]
    fn test_type_mismatch_with_intent() {
        let kp = Ed25519KeyPair::generate();
        let mut c = CeremonyStateMachine::new();
        c.declare_intent(&kp.did(), ORIGIN, DepartureType::Voluntary, &kp)
            .unwrap();
        c.snapshot().unwrap();
        let err = c
            .sign_marker(&marker_for(&kp, DepartureType::Forced), &kp)
            .unwrap_err();
        assert!(matches!(err, MarkerError::DepartureTypeMismatch { .. }));
        assert_eq!(c.state(), CeremonyState::Snapshot);
    }

    #[test]
    fn test_illegal_transition_lists_legal_states() {
        let mut c = CeremonyStateMachine::new();
        match c.open_challenge().unwrap_err() {
            MarkerError::IllegalTransition { from, to, legal } => {
                assert_eq!(from, CeremonyState::Alive);
                assert_eq!(to, CeremonyState::Open);
                assert_eq!(legal, vec![CeremonyState::Intent, CeremonyState::Final]);
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_every_operation_after_departed_is_terminal() {
        let kp = Ed25519KeyPair::generate();
        let mut c = CeremonyStateMachine::new();
        c.declare_intent(&kp.did(), ORIGIN, DepartureType::Emergency, &kp)
            .unwrap();
        let m = marker_for(&kp, DepartureType::Emergency);
        c.sign_marker(&m, &kp).unwrap();
        c.depart().unwrap();

        let terminal = |r: Result<()>| matches!(r, Err(MarkerError::TerminalState { .. }));
        assert!(terminal(c.snapshot()));
        assert!(terminal(c.open_challenge()));
        assert!(terminal(c.contest()));
        assert!(terminal(c.depart().map(|_| ())));
        assert!(terminal(c.witness(&kp).map(|_| ())));
        assert!(terminal(c.sign_marker(&m, &kp).map(|_| ())));
        assert!(terminal(
            c.declare_intent(&kp.did(), ORIGIN, DepartureType::Voluntary, &kp)
                .map(|_| ())
        ));
    }

    #[test]
    fn test_terminal_error_names_state_target_and_empty_legal_set() {
        let kp = Ed25519KeyPair::generate();
        let mut c = CeremonyStateMachine::new();
        c.declare_intent(&kp.did(), ORIGIN, DepartureType::Voluntary, &kp)
            .unwrap();
        c.snapshot().unwrap();
        c.sign_marker(&marker_for(&kp, DepartureType::Voluntary), &kp)
            .unwrap();
        c.depart().unwrap();

        let err = c.snapshot().unwrap_err();
        match &err {
            MarkerError::TerminalState {
                operation,
                from,
                to,
                legal,
            } => {
                assert_eq!(operation, "snapshot");
                assert_eq!(*from, CeremonyState::Departed);
                assert_eq!(*to, CeremonyState::Snapshot);
                assert!(legal.is_empty());
            }
            other => panic!("expected terminal state error, got {other}"),
        }
        let message = err.to_string();
        assert!(message.contains("departed -> snapshot"), "{message}");
        assert!(message.contains("none, terminal"), "{message}");

        assert!(matches!(
            c.depart(),
            Err(MarkerError::TerminalState { to: CeremonyState::Departed, .. })
        ));
        assert_eq!(c.history().last(), Some(&CeremonyState::Departed));
        assert_eq!(c.history().len(), 5);
    }

    #[test]
    fn test_witness_only_in_final() {
        let kp = Ed25519KeyPair::generate();
        let witness = P256KeyPair::generate();
        let mut c = CeremonyStateMachine::new();
        assert!(matches!(
            c.witness(&witness),
            Err(MarkerError::NotFinal { .. })
        ));

        c.declare_intent(&kp.did(), ORIGIN, DepartureType::Voluntary, &kp)
            .unwrap();
        c.snapshot().unwrap();
        let signed = c
            .sign_marker(&marker_for(&kp, DepartureType::Voluntary), &kp)
            .unwrap();
        let att = c.witness(&witness).unwrap();
        assert!(verify_witness(&signed, &att).valid);
        assert_eq!(c.witnesses().len(), 1);
        // subject proof untouched
        assert_eq!(c.signed_marker().unwrap().proof, signed.proof);
    }

    #[test]
    fn test_telemetry_sees_public_attributes_only() {
        let kp = Ed25519KeyPair::generate();
        let telemetry = Arc::new(MemoryTelemetry::new());
        let mut c = CeremonyStateMachine::with_telemetry(telemetry.clone());
        c.declare_intent(&kp.did(), ORIGIN, DepartureType::Emergency, &kp)
            .unwrap();
        let signed = c
            .sign_marker(&marker_for(&kp, DepartureType::Emergency), &kp)
            .unwrap();

        let events = telemetry.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].operation, "sign_marker");
        assert_eq!(events[1].marker_id.as_deref(), Some(signed.id.as_str()));
        assert_eq!(events[1].did.as_deref(), Some(kp.did().as_str()));
        assert_eq!(events[1].outcome, Outcome::Success);
    }
}
