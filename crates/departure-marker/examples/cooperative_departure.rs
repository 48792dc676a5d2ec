//! Cooperative Departure: walk a ceremony from intent to departed, then
//! verify the marker the way a receiving platform would.
//!
//! Run with:
//!   cargo run --example cooperative_departure -p departure-marker

use departure_marker::ceremony::CeremonyStateMachine;
use departure_marker::crypto::{Algorithm, P256KeyPair, Signer};
use departure_marker::keylog::{is_key_compromised, PreRotatedIdentity, RotationReason};
use departure_marker::marker::{DepartureType, MarkerBuilder, Standing};
use departure_marker::proof::{verify_marker_json, verify_witness};

const ORIGIN: &str = "https://agents.origin.example";

fn main() {
    // ── 1. A pre-rotated identity ───────────────────────────────────────────
    //
    // The next key is committed at inception, so a stolen current key
    // cannot rotate the identity.
    let mut agent =
        PreRotatedIdentity::generate(Algorithm::Ed25519).expect("identity generation");
    println!("Agent:      {}", agent.did());
    println!("Identifier: {}", agent.identifier());
    println!();

    // ── 2. The ceremony ─────────────────────────────────────────────────────
    let mut ceremony = CeremonyStateMachine::new();
    ceremony
        .declare_intent(&agent.did(), ORIGIN, DepartureType::Voluntary, agent.signer())
        .expect("intent");
    println!("State: {}", ceremony.state());
    ceremony.snapshot().expect("snapshot");
    println!("State: {}", ceremony.state());

    let marker = MarkerBuilder::new(agent.did(), ORIGIN, DepartureType::Voluntary)
        .standing(Standing::GoodStanding)
        .module("handover", serde_json::json!({ "openTasks": 0 }))
        .build()
        .expect("marker");
    ceremony.sign_marker(&marker, agent.signer()).expect("sign");

    let witness = P256KeyPair::generate();
    let attestation = ceremony.witness(&witness).expect("witness");
    let marker = ceremony.depart().expect("depart");
    println!(
        "State: {} via {}",
        ceremony.state(),
        ceremony.path().map(|p| p.to_string()).unwrap_or_default()
    );
    println!();

    // ── 3. Verification on the receiving side ───────────────────────────────
    //
    // The destination only sees JSON bytes. Reordering or whitespace does
    // not matter; canonical form is recomputed before checking.
    let json = marker.to_json_pretty().expect("serialize");
    println!("{json}");
    let result = verify_marker_json(&json);
    println!("Marker:  {result}");
    println!("Witness: {}", verify_witness(&marker, &attestation));
    println!();

    // ── 4. Rotation after departure ─────────────────────────────────────────
    //
    // The marker stays cryptographically valid, but anyone holding the
    // current key log can see its key was retired.
    agent
        .rotate(Some(RotationReason::Compromised))
        .expect("rotation");
    println!(
        "Signing key compromised after rotation: {}",
        is_key_compromised(agent.log().state(), &marker)
    );
}
