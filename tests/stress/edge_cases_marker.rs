//! Edge cases: adversarial and unusual markers must degrade to a structured
//! invalid result, never a panic or an error.

use departure_marker::canonical::compute_id;
use departure_marker::crypto::{
    decode_multibase, encode_multibase, Ed25519KeyPair, P256KeyPair, Signer,
};
use departure_marker::marker::{
    DepartureMarker, DepartureType, IdentityClaim, MarkerBuilder, TrustEnhancers,
};
use departure_marker::proof::{sign_marker, verify_marker, verify_marker_json};
use departure_marker::MarkerError;

const TS: &str = "2025-04-01T09:30:00Z";

fn signed_by(signer: &dyn Signer) -> DepartureMarker {
    let marker = MarkerBuilder::new(signer.did(), "https://platform.example", DepartureType::Voluntary)
        .timestamp(TS)
        .build()
        .expect("build");
    sign_marker(&marker, signer).expect("sign")
}

#[test]
fn edge_every_signature_byte_matters() {
    for signer in [
        &Ed25519KeyPair::generate() as &dyn Signer,
        &P256KeyPair::generate() as &dyn Signer,
    ] {
        let marker = signed_by(signer);
        let sig = decode_multibase(&marker.proof.proof_value).expect("multibase");
        assert_eq!(sig.len(), 64);
        for i in 0..sig.len() {
            let mut flipped = sig.clone();
            flipped[i] ^= 0x01;
            let mut tampered = marker.clone();
            tampered.proof.proof_value = encode_multibase(&flipped);
            let result = verify_marker(&tampered);
            assert!(!result.valid, "flip at byte {i} must fail");
        }
    }
}

#[test]
fn edge_relabeled_proof_type_is_algorithm_mismatch() {
    let mut marker = signed_by(&P256KeyPair::generate());
    marker.proof.proof_type = "Ed25519Signature2020".into();
    let result = verify_marker(&marker);
    assert!(result.has("algorithm_mismatch"), "got {:?}", result.codes());

    marker.proof.proof_type = "RsaSignature2018".into();
    assert!(verify_marker(&marker).has("unknown_proof_type"));
}

#[test]
fn edge_subject_signed_by_someone_else() {
    let victim = Ed25519KeyPair::generate();
    let attacker = Ed25519KeyPair::generate();
    let marker = MarkerBuilder::new(victim.did(), "https://platform.example", DepartureType::Forced)
        .build()
        .expect("build");
    let forged = sign_marker(&marker, &attacker).expect("sign");
    let result = verify_marker(&forged);
    assert!(!result.valid);
    assert!(result.has("attribution_forgery"));
    assert!(!result.has("signature_invalid"));
}

#[test]
fn edge_unsigned_marker_is_incomplete() {
    let marker = MarkerBuilder::new("did:example:a", "https://o.example", DepartureType::Voluntary)
        .build()
        .expect("build");
    let result = verify_marker(&marker);
    assert!(!result.valid);
    assert!(result.has("incomplete_proof"));
}

#[test]
fn edge_garbage_json_is_malformed() {
    for input in ["", "null", "[]", "{", "{\"id\": 7}", "\"marker\""] {
        let result = verify_marker_json(input);
        assert!(!result.valid, "input {input:?}");
        assert!(result.has("malformed_input"), "input {input:?}");
    }
}

#[test]
fn edge_unknown_field_cannot_ride_along() {
    let marker = signed_by(&Ed25519KeyPair::generate());
    let mut value = serde_json::to_value(&marker).unwrap();
    value["injected"] = serde_json::json!("unsigned claim");
    let result = verify_marker_json(&value.to_string());
    assert!(result.has("malformed_input"));
}

#[test]
fn edge_reordered_whitespace_json_still_verifies() {
    let marker = signed_by(&Ed25519KeyPair::generate());
    let value = serde_json::to_value(&marker).unwrap();
    let object = value.as_object().unwrap();
    let mut keys: Vec<&String> = object.keys().collect();
    keys.reverse();
    let body = keys
        .iter()
        .map(|k| format!("\n   {}  :  {}", serde_json::to_string(k).unwrap(), object[*k]))
        .collect::<Vec<_>>()
        .join(",");
    let reordered = format!("{{{body}\n}}");
    let result = verify_marker_json(&reordered);
    assert!(result.valid, "{result}");
}

#[test]
fn edge_nfc_variants_share_an_id() {
    let composed = MarkerBuilder::new("did:example:zoë", "https://café.example", DepartureType::Voluntary)
        .timestamp(TS)
        .build()
        .expect("build");
    let decomposed = MarkerBuilder::new(
        "did:example:zoe\u{0308}",
        "https://cafe\u{0301}.example",
        DepartureType::Voluntary,
    )
    .timestamp(TS)
    .build()
    .expect("build");
    assert_ne!(composed.subject, decomposed.subject);
    assert_eq!(composed.id, decomposed.id);
    assert_eq!(compute_id(&composed).unwrap(), compute_id(&decomposed).unwrap());
}

#[test]
fn edge_emergency_without_justification_names_the_field() {
    let err = MarkerBuilder::new("did:example:a", "https://o.example", DepartureType::Emergency)
        .build()
        .unwrap_err();
    match err {
        MarkerError::Validation(issues) => {
            assert!(issues.iter().any(|i| i.field == "emergencyJustification"));
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn edge_malformed_enhancer_reported_with_path() {
    let mut marker = signed_by(&Ed25519KeyPair::generate());
    marker.trust_enhancers = Some(TrustEnhancers {
        identity_claims: vec![IdentityClaim {
            claim_type: "email".into(),
            issuer: String::new(),
            value: "a@example.com".into(),
        }],
        ..Default::default()
    });
    let result = verify_marker(&marker);
    assert!(result.has("schema"));
    assert!(result.has("id_mismatch"));
    assert!(result.to_string().contains("trustEnhancers.identityClaims[0].issuer"));
}

#[test]
fn edge_huge_module_payload() {
    let signer = Ed25519KeyPair::generate();
    let blob: Vec<u32> = (0..50_000).collect();
    let marker = MarkerBuilder::new(signer.did(), "https://platform.example", DepartureType::Voluntary)
        .module("archive", serde_json::json!({ "blocks": blob }))
        .build()
        .expect("build");
    let signed = sign_marker(&marker, &signer).expect("sign");
    assert!(verify_marker(&signed).valid);
}

#[test]
fn edge_module_keys_colliding_after_nfc_are_refused() {
    let signer = Ed25519KeyPair::generate();
    let mut marker = signed_by(&signer);
    let mut modules = std::collections::BTreeMap::new();
    modules.insert(
        "archive".to_string(),
        serde_json::json!({ "re\u{0301}sume\u{0301}": "a", "r\u{00e9}sum\u{00e9}": "b" }),
    );
    marker.modules = Some(modules);

    let result = verify_marker(&marker);
    assert!(!result.valid);
    assert!(result.has("schema"), "got {:?}", result.codes());
    assert!(matches!(
        sign_marker(&marker, &signer),
        Err(MarkerError::Validation(_))
    ));
    assert!(matches!(
        compute_id(&marker),
        Err(MarkerError::Canonicalization(_))
    ));
}
