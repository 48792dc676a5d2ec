//! Stress test: a 1000-marker batch exit. Every marker proves membership,
//! and no proof transfers to another marker or root.

use std::time::Instant;

use departure_marker::batch::{
    compute_merkle_proof, compute_merkle_root, verify_batch_membership, verify_merkle_proof,
    BatchExit,
};
use departure_marker::crypto::{Ed25519KeyPair, Signer};
use departure_marker::marker::{DepartureMarker, DepartureType, MarkerBuilder};
use departure_marker::proof::sign_marker;

fn shutdown_markers(n: usize) -> Vec<DepartureMarker> {
    (0..n)
        .map(|i| {
            let agent = Ed25519KeyPair::generate();
            let marker = MarkerBuilder::new(
                agent.did(),
                "https://closing-platform.example",
                DepartureType::PlatformShutdown,
            )
            .timestamp("2025-06-30T23:59:59Z")
            .build()
            .expect("marker should build");
            // batching ignores proofs, so half the markers stay unsigned
            if i % 2 == 0 {
                sign_marker(&marker, &agent).expect("sign")
            } else {
                marker
            }
        })
        .collect()
}

#[test]
fn stress_1000_marker_batch() {
    let markers = shutdown_markers(1000);

    let start = Instant::now();
    let mut batch = BatchExit::build(&markers).expect("batch should build");
    let build_elapsed = start.elapsed();
    assert_eq!(batch.len(), 1000);

    for (i, marker) in markers.iter().enumerate() {
        let proof = batch.proof_for(&marker.id).expect("proof for every marker");
        assert!(
            verify_batch_membership(marker, &proof, &batch.root),
            "marker {i} should be a member"
        );
        // ceil(log2(1000)) levels
        assert_eq!(proof.siblings.len(), 10);
    }
    let total_elapsed = start.elapsed();
    eprintln!("1000-marker batch: build {build_elapsed:?}, build + verify {total_elapsed:?}");
    assert!(
        total_elapsed.as_secs() < 5,
        "building and verifying 1000 memberships took {total_elapsed:?}"
    );

    batch.sign(&Ed25519KeyPair::generate()).expect("sign root");
    assert!(batch.verify_signature().valid);
}

#[test]
fn stress_batch_root_matches_free_functions() {
    let markers = shutdown_markers(257);
    let ids: Vec<String> = markers.iter().map(|m| m.id.clone()).collect();
    let batch = BatchExit::build(&markers).expect("batch");
    assert_eq!(compute_merkle_root(&ids).expect("root"), batch.root);

    for index in [0, 1, 128, 255, 256] {
        let from_batch = batch.proof_at(index).expect("proof");
        let direct = compute_merkle_proof(&ids, index).expect("proof");
        assert_eq!(from_batch, direct);
    }
}

#[test]
fn stress_proofs_do_not_transfer() {
    let markers = shutdown_markers(64);
    let batch = BatchExit::build(&markers).expect("batch");
    let other = BatchExit::build(&shutdown_markers(64)).expect("batch");

    let proof = batch.proof_at(10).expect("proof");
    assert!(!verify_batch_membership(&markers[11], &proof, &batch.root));
    assert!(!verify_merkle_proof(&proof, &other.root));

    let mut forged = proof.clone();
    forged.siblings[3].hash = "00".repeat(32);
    assert!(!verify_merkle_proof(&forged, &batch.root));
}
