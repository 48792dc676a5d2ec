//! Integration test: full end-to-end departure workflow.
//!
//! 1. Generate a pre-rotated identity and a witness
//! 2. Run a cooperative ceremony to a signed marker
//! 3. Ship it over a framed byte stream and verify on the other side
//! 4. Witness it, index its claims, and persist everything
//! 5. Rotate keys and detect the retired signer
//! 6. Batch a platform shutdown

use std::sync::Arc;

use departure_marker::batch::{verify_batch_membership, BatchExit};
use departure_marker::ceremony::{CeremonyPath, CeremonyState, CeremonyStateMachine};
use departure_marker::claims::{ClaimKind, ClaimStore, MemoryClaimStore};
use departure_marker::crypto::{Algorithm, Ed25519KeyPair, P256KeyPair, Signer};
use departure_marker::keylog::{is_key_compromised, PreRotatedIdentity, RotationReason};
use departure_marker::marker::expiry;
use departure_marker::marker::{
    DepartureMarker, DepartureType, MarkerBuilder, Standing, TrustEnhancers, WitnessReference,
};
use departure_marker::proof::{verify_marker, verify_marker_json, verify_witness};
use departure_marker::storage::{FileMarkerStore, KeyLogStore, MarkerStore};
use departure_marker::telemetry::{MemoryTelemetry, Outcome};
use departure_marker::transport::{read_frame, write_frame, DEFAULT_MAX_FRAME};
use departure_marker::MarkerError;

const ORIGIN: &str = "https://agents.platform.example";

#[test]
fn full_workflow_ceremony_to_batch() {
    let home = tempfile::tempdir().expect("tempdir");

    // ── Step 1: Identities ──────────────────────────────────────────────
    let mut agent = PreRotatedIdentity::generate(Algorithm::Ed25519).expect("identity");
    let witness = P256KeyPair::generate();

    // ── Step 2: Cooperative ceremony ────────────────────────────────────
    let telemetry = Arc::new(MemoryTelemetry::new());
    let mut ceremony = CeremonyStateMachine::with_telemetry(telemetry.clone());
    ceremony
        .declare_intent(&agent.did(), ORIGIN, DepartureType::Voluntary, agent.signer())
        .expect("intent");
    ceremony.snapshot().expect("snapshot");

    let unsigned = MarkerBuilder::new(agent.did(), ORIGIN, DepartureType::Voluntary)
        .standing(Standing::GoodStanding)
        .trust_enhancers(TrustEnhancers {
            witness_attestations: vec![WitnessReference {
                witness: witness.did(),
                attested_at: departure_marker::time::now_rfc3339(),
                statement: Some("observed a clean handover".into()),
            }],
            ..Default::default()
        })
        .build()
        .expect("marker should build");
    ceremony.sign_marker(&unsigned, agent.signer()).expect("sign");
    let attestation = ceremony.witness(&witness).expect("witness");
    let marker = ceremony.depart().expect("depart");

    assert_eq!(ceremony.state(), CeremonyState::Departed);
    assert_eq!(ceremony.path(), Some(CeremonyPath::Cooperative));
    assert!(matches!(
        ceremony.snapshot(),
        Err(MarkerError::TerminalState { .. })
    ));
    let events = telemetry.events();
    assert_eq!(
        events.iter().map(|e| e.operation).collect::<Vec<_>>(),
        vec!["declare_intent", "sign_marker", "witness"]
    );
    assert!(events.iter().all(|e| e.outcome == Outcome::Success));

    // ── Step 3: Transport and independent verification ──────────────────
    let mut wire = Vec::new();
    write_frame(&mut wire, &marker).expect("frame");
    let body = read_frame(&mut wire.as_slice(), DEFAULT_MAX_FRAME).expect("unframe");
    let received = std::str::from_utf8(&body).expect("utf-8");
    let result = verify_marker_json(received);
    assert!(result.valid, "{result}");
    assert!(result.errors.is_empty());

    let received: DepartureMarker = serde_json::from_str(received).expect("parse");
    assert!(verify_witness(&received, &attestation).valid);
    assert!(!expiry::is_expired(&received, chrono::Utc::now()).expect("expiry"));

    // ── Step 4: Claims and persistence ──────────────────────────────────
    let claims = MemoryClaimStore::new();
    assert_eq!(claims.index_marker(&received).expect("index"), 1);
    let by_witness = claims.by_asserter(&witness.did()).expect("lookup");
    assert_eq!(by_witness.len(), 1);
    assert_eq!(by_witness[0].kind, ClaimKind::WitnessAttestation);

    let markers = FileMarkerStore::new(home.path().join("markers")).expect("store");
    markers.save(&received).expect("save");
    assert_eq!(markers.load(&received.id).expect("load"), received);

    // ── Step 5: Rotation retires the signing key ────────────────────────
    let logs = KeyLogStore::new(home.path().join("keylogs")).expect("store");
    assert!(!is_key_compromised(agent.log().state(), &received));
    agent
        .rotate(Some(RotationReason::Scheduled))
        .expect("rotate");
    logs.save(agent.log()).expect("save log");

    let reloaded = logs.load(agent.identifier()).expect("replay");
    assert!(is_key_compromised(reloaded.state(), &received));
    assert!(verify_marker(&received).valid);

    // ── Step 6: Platform shutdown batch ─────────────────────────────────
    let mut departures: Vec<DepartureMarker> = (0..5)
        .map(|i| {
            let key = Ed25519KeyPair::generate();
            let m = MarkerBuilder::new(
                key.did(),
                format!("https://shard-{i}.example"),
                DepartureType::PlatformShutdown,
            )
            .build()
            .expect("build");
            departure_marker::proof::sign_marker(&m, &key).expect("sign")
        })
        .collect();
    departures.push(received.clone());

    let mut batch = BatchExit::build(&departures).expect("batch");
    batch.sign(&witness).expect("sign root");
    assert!(batch.verify_signature().valid);
    for m in &departures {
        let proof = batch.proof_for(&m.id).expect("proof");
        assert!(verify_batch_membership(m, &proof, &batch.root));
    }
}

#[test]
fn full_workflow_emergency_and_unilateral_paths() {
    let agent = Ed25519KeyPair::generate();

    let mut emergency = CeremonyStateMachine::new();
    emergency
        .declare_intent(&agent.did(), ORIGIN, DepartureType::Emergency, &agent)
        .expect("intent");
    assert_eq!(emergency.state(), CeremonyState::Alive);
    let marker = MarkerBuilder::new(agent.did(), ORIGIN, DepartureType::Emergency)
        .emergency_justification("credentials exfiltrated")
        .build()
        .expect("build");
    emergency.sign_marker(&marker, &agent).expect("sign");
    assert_eq!(emergency.path(), Some(CeremonyPath::Emergency));
    assert!(verify_marker(&emergency.depart().expect("depart")).valid);

    let mut unilateral = CeremonyStateMachine::new();
    unilateral
        .declare_intent(&agent.did(), ORIGIN, DepartureType::Forced, &agent)
        .expect("intent");
    unilateral.snapshot().expect("snapshot");
    unilateral.open_challenge().expect("open");
    let marker = MarkerBuilder::new(agent.did(), ORIGIN, DepartureType::Forced)
        .standing(Standing::Disputed)
        .build()
        .expect("build");

    // the declared type binds the marker
    let wrong = MarkerBuilder::new(agent.did(), ORIGIN, DepartureType::Voluntary)
        .build()
        .expect("build");
    assert!(matches!(
        unilateral.sign_marker(&wrong, &agent),
        Err(MarkerError::DepartureTypeMismatch { .. })
    ));
    assert_eq!(unilateral.state(), CeremonyState::Open);

    unilateral.sign_marker(&marker, &agent).expect("sign");
    assert_eq!(unilateral.path(), Some(CeremonyPath::Unilateral));
    assert_eq!(
        unilateral.history(),
        &[
            CeremonyState::Alive,
            CeremonyState::Intent,
            CeremonyState::Snapshot,
            CeremonyState::Open,
            CeremonyState::Final
        ]
    );
}
