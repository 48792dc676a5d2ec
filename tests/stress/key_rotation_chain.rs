//! Stress test: long pre-rotated key chains replay deterministically and
//! reject out-of-order or unauthorized events without changing state.

use departure_marker::crypto::{Algorithm, KeyPair, Signer};
use departure_marker::error::{KeyLogViolation, MarkerError};
use departure_marker::keylog::{
    is_key_compromised, key_digest, verify_key_state, KeyEvent, KeyEventLog, KeyStatus,
    PreRotatedIdentity, RotationReason,
};
use departure_marker::marker::{DepartureType, MarkerBuilder};
use departure_marker::proof::{sign_marker, verify_marker};

#[test]
fn stress_100_rotations_replay() {
    for alg in Algorithm::ALL {
        let mut identity = PreRotatedIdentity::generate(alg).expect("generate");
        let mut dids = vec![identity.did()];
        for i in 0..100 {
            let reason = (i % 10 == 0).then_some(RotationReason::Scheduled);
            identity.rotate(reason).expect("rotation should succeed");
            dids.push(identity.did());
        }

        let log = identity.log();
        assert_eq!(log.len(), 101);
        assert_eq!(log.state().sequence, 100);

        let replayed = verify_key_state(log.events()).expect("replay");
        assert_eq!(&replayed, log.state());
        assert_eq!(
            verify_key_state(log.events()).expect("replay"),
            replayed,
            "replay must be deterministic"
        );

        for (seq, did) in dids.iter().enumerate().take(100) {
            assert_eq!(
                replayed.key_status(did),
                KeyStatus::Retired {
                    at_sequence: seq as u64 + 1
                }
            );
        }
        assert_eq!(replayed.key_status(&dids[100]), KeyStatus::Current);
    }
}

#[test]
fn stress_marker_signed_by_old_key_is_flagged() {
    let mut identity = PreRotatedIdentity::generate(Algorithm::Ed25519).expect("generate");
    let marker = MarkerBuilder::new(
        identity.did(),
        "https://platform.example",
        DepartureType::Voluntary,
    )
    .build()
    .expect("build");
    let signed = sign_marker(&marker, identity.signer()).expect("sign");
    assert!(!is_key_compromised(identity.log().state(), &signed));

    for _ in 0..5 {
        identity.rotate(Some(RotationReason::Compromised)).expect("rotate");
    }
    // Still cryptographically valid, but its key has been rotated out.
    assert!(verify_marker(&signed).valid);
    assert!(is_key_compromised(identity.log().state(), &signed));
}

#[test]
fn stress_unauthorized_events_leave_log_unchanged() {
    let current = KeyPair::generate(Algorithm::Ed25519);
    let next = KeyPair::generate(Algorithm::Ed25519);
    let attacker = KeyPair::generate(Algorithm::Ed25519);
    let mut log = KeyEventLog::incept(&current, &[next.did()]).expect("incept");
    let before = log.state().clone();

    for _ in 0..50 {
        let after = KeyPair::generate(Algorithm::Ed25519);
        let forged = log
            .rotate_event(&attacker, &[next.did()], &[key_digest(&after.did())])
            .expect("build event");
        let err = log.append(forged).unwrap_err();
        assert!(matches!(
            err,
            MarkerError::KeyLog(KeyLogViolation::UnauthorizedSigner { .. })
        ));

        let uncommitted = log
            .rotate_event(&current, &[attacker.did()], &[key_digest(&after.did())])
            .expect("build event");
        assert!(log.append(uncommitted).is_err());
    }

    assert_eq!(log.len(), 1);
    assert_eq!(log.state(), &before);
}

#[test]
fn stress_reordered_chain_rejected() {
    let mut identity = PreRotatedIdentity::generate(Algorithm::P256).expect("generate");
    for _ in 0..10 {
        identity.rotate(None).expect("rotate");
    }
    let mut events: Vec<KeyEvent> = identity.log().events().to_vec();
    events.swap(4, 5);
    assert!(verify_key_state(&events).is_err());

    let mut truncated_head = identity.log().events().to_vec();
    truncated_head.remove(0);
    assert!(verify_key_state(&truncated_head).is_err());
}
