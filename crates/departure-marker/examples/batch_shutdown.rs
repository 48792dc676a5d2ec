//! Batch Shutdown: a closing platform commits every agent's departure to a
//! single signed Merkle root.
//!
//! Run with:
//!   cargo run --example batch_shutdown -p departure-marker

use departure_marker::batch::{verify_batch_membership, BatchExit};
use departure_marker::crypto::{Ed25519KeyPair, Signer};
use departure_marker::marker::{DepartureMarker, DepartureType, MarkerBuilder};
use departure_marker::proof::sign_marker;

fn main() {
    let platform = Ed25519KeyPair::generate();

    let markers: Vec<DepartureMarker> = (0..8)
        .map(|_| {
            let agent = Ed25519KeyPair::generate();
            let marker = MarkerBuilder::new(
                agent.did(),
                "https://closing.example",
                DepartureType::PlatformShutdown,
            )
            .build()
            .expect("marker");
            sign_marker(&marker, &agent).expect("sign")
        })
        .collect();

    let mut batch = BatchExit::build(&markers).expect("batch");
    batch.sign(&platform).expect("sign root");
    println!("Root:      {}", batch.root);
    println!("Markers:   {}", batch.len());
    println!("Signature: {}", batch.verify_signature());
    println!();

    // Each agent carries its own proof; the root is all a verifier needs.
    for marker in &markers {
        let proof = batch.proof_for(&marker.id).expect("proof");
        println!(
            "{}  siblings={}  member={}",
            &marker.id[..16],
            proof.siblings.len(),
            verify_batch_membership(marker, &proof, &batch.root)
        );
    }
}
