//! Stress test: markers signed and verified from many threads at once,
//! plus concurrent appends racing on one shared key event log.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use departure_marker::crypto::{Algorithm, KeyPair, Signer};
use departure_marker::keylog::{key_digest, KeyEventLog, SharedKeyEventLog};
use departure_marker::marker::{DepartureType, MarkerBuilder};
use departure_marker::proof::{sign_marker, verify_marker};

#[test]
fn stress_1000_sequential_signs() {
    let key = KeyPair::generate(Algorithm::Ed25519);
    let did = key.did();
    let mut ids = HashSet::new();

    for i in 0..1000 {
        let marker = MarkerBuilder::new(
            did.clone(),
            format!("https://platform-{i}.example"),
            DepartureType::Voluntary,
        )
        .build()
        .expect("marker should build");
        let signed = sign_marker(&marker, &key).expect("signing should succeed");
        let result = verify_marker(&signed);
        assert!(result.valid, "marker {i} should verify: {result}");
        assert!(ids.insert(signed.id.clone()), "duplicate id at {i}");
    }

    assert_eq!(ids.len(), 1000);
}

#[test]
fn stress_shared_signer_across_threads() {
    let keys: Vec<Arc<KeyPair>> = Algorithm::ALL
        .into_iter()
        .map(|alg| Arc::new(KeyPair::generate(alg)))
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let key = Arc::clone(&keys[t % keys.len()]);
            thread::spawn(move || {
                for i in 0..50 {
                    let marker = MarkerBuilder::new(
                        key.did(),
                        format!("https://t{t}-m{i}.example"),
                        DepartureType::PlatformShutdown,
                    )
                    .build()
                    .expect("marker should build");
                    let signed = sign_marker(&marker, key.as_ref()).expect("sign");
                    assert!(verify_marker(&signed).valid, "thread {t} marker {i}");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread should not panic");
    }
}

#[test]
fn stress_racing_rotations_have_one_winner() {
    let current = KeyPair::generate(Algorithm::P256);
    let next = KeyPair::generate(Algorithm::P256);
    let log = KeyEventLog::incept(&current, &[next.did()]).expect("incept");

    // Every thread builds a valid rotation against the same tip.
    let events: Vec<_> = (0..16)
        .map(|_| {
            let after = KeyPair::generate(Algorithm::P256);
            log.rotate_event(&current, &[next.did()], &[key_digest(&after.did())])
                .expect("rotation event")
        })
        .collect();

    let shared = SharedKeyEventLog::new(log);
    let handles: Vec<_> = events
        .into_iter()
        .map(|event| {
            let shared = shared.clone();
            thread::spawn(move || shared.append(event).is_ok())
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().expect("thread should not panic"))
        .filter(|ok| *ok)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(shared.len(), 2);
    assert_eq!(shared.state().sequence, 1);
}
