//! Structural validation of markers.
//!
//! Every check runs; the caller gets the full list of issues. Field names
//! are the JSON names.

use serde_json::Value;

use crate::canonical;
use crate::crypto::did;
use crate::error::ValidationIssue;
use crate::time::parse_rfc3339;

use super::types::{DepartureMarker, DepartureType, LegalHold, TrustEnhancers};
use super::{MARKER_CONTEXT, SPEC_VERSION};

/// Validate a marker's structure. Empty result means valid.
///
/// The proof is not examined here; signature checks live in
/// [`crate::proof::verify_marker`].
pub fn validate(marker: &DepartureMarker) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if marker.context != MARKER_CONTEXT {
        issues.push(ValidationIssue::new(
            "@context",
            format!("must be {MARKER_CONTEXT}"),
        ));
    }
    if marker.spec_version != SPEC_VERSION {
        issues.push(ValidationIssue::new(
            "specVersion",
            format!("unsupported version '{}'", marker.spec_version),
        ));
    }
    if !marker.id.is_empty() && !is_hex_digest(&marker.id) {
        issues.push(ValidationIssue::new(
            "id",
            "must be a lowercase hex SHA-256 digest",
        ));
    }

    check_subject(&marker.subject, &mut issues);
    check_origin(&marker.origin, &mut issues);
    check_timestamp("timestamp", &marker.timestamp, &mut issues);

    let justified = marker
        .emergency_justification
        .as_deref()
        .is_some_and(|j| !j.trim().is_empty());
    match (marker.departure_type, justified) {
        (DepartureType::Emergency, false) => issues.push(ValidationIssue::new(
            "emergencyJustification",
            "required for emergency departures",
        )),
        (t, _) if t != DepartureType::Emergency && marker.emergency_justification.is_some() => {
            issues.push(ValidationIssue::new(
                "emergencyJustification",
                "only allowed for emergency departures",
            ))
        }
        _ => {}
    }

    if let Some(hold) = &marker.legal_hold {
        check_legal_hold(hold, &mut issues);
    }

    if let Some(expires) = &marker.expires {
        match (parse_rfc3339(expires), parse_rfc3339(&marker.timestamp)) {
            (None, _) => issues.push(ValidationIssue::new(
                "expires",
                "must be an RFC 3339 timestamp",
            )),
            (Some(e), Some(t)) if e <= t => issues.push(ValidationIssue::new(
                "expires",
                "must be after the departure timestamp",
            )),
            _ => {}
        }
    }

    if let Some(modules) = &marker.modules {
        if modules.keys().any(|k| k.trim().is_empty()) {
            issues.push(ValidationIssue::new("modules", "module names must not be empty"));
        }
        let tree = Value::Object(modules.clone().into_iter().collect());
        if let Some(key) = canonical::normalized_key_collision(&tree) {
            issues.push(ValidationIssue::new(
                "modules",
                format!("two keys normalize to {key:?}"),
            ));
        }
    }

    if let Some(enhancers) = &marker.trust_enhancers {
        check_trust_enhancers(enhancers, &mut issues);
    }

    issues
}

/// 64 lowercase hex characters.
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// `scheme:rest`, where the scheme is `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
pub fn has_uri_scheme(s: &str) -> bool {
    let Some((scheme, rest)) = s.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_alpha
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
}

fn check_subject(subject: &str, issues: &mut Vec<ValidationIssue>) {
    if subject.trim().is_empty() {
        issues.push(ValidationIssue::new("subject", "must not be empty"));
    } else if subject.starts_with(did::DID_KEY_PREFIX) {
        if let Err(e) = did::decode_did(subject) {
            issues.push(ValidationIssue::new("subject", e.to_string()));
        }
    }
}

fn check_origin(origin: &str, issues: &mut Vec<ValidationIssue>) {
    if origin.trim().is_empty() {
        issues.push(ValidationIssue::new("origin", "must not be empty"));
    } else if !has_uri_scheme(origin) {
        issues.push(ValidationIssue::new("origin", "must be a URI with a scheme"));
    }
}

fn check_timestamp(field: &str, value: &str, issues: &mut Vec<ValidationIssue>) {
    if parse_rfc3339(value).is_none() {
        issues.push(ValidationIssue::new(
            field,
            "must be an RFC 3339 timestamp",
        ));
    }
}

fn check_required(field: &str, value: &str, issues: &mut Vec<ValidationIssue>) {
    if value.trim().is_empty() {
        issues.push(ValidationIssue::new(field, "must not be empty"));
    }
}

fn check_legal_hold(hold: &LegalHold, issues: &mut Vec<ValidationIssue>) {
    check_required("legalHold.authority", &hold.authority, issues);
    check_required("legalHold.reference", &hold.reference, issues);
    check_required("legalHold.holdType", &hold.hold_type, issues);
    check_timestamp("legalHold.dateIssued", &hold.date_issued, issues);
}

pub(crate) fn check_trust_enhancers(enhancers: &TrustEnhancers, issues: &mut Vec<ValidationIssue>) {
    for (i, ts) in enhancers.timestamp_attestations.iter().enumerate() {
        let at = |f: &str| format!("trustEnhancers.timestampAttestations[{i}].{f}");
        check_required(&at("authority"), &ts.authority, issues);
        check_required(&at("token"), &ts.token, issues);
        check_timestamp(&at("timestamp"), &ts.timestamp, issues);
    }
    for (i, w) in enhancers.witness_attestations.iter().enumerate() {
        let at = |f: &str| format!("trustEnhancers.witnessAttestations[{i}].{f}");
        if let Err(e) = did::decode_did(&w.witness) {
            issues.push(ValidationIssue::new(at("witness"), e.to_string()));
        }
        check_timestamp(&at("attestedAt"), &w.attested_at, issues);
    }
    for (i, c) in enhancers.identity_claims.iter().enumerate() {
        let at = |f: &str| format!("trustEnhancers.identityClaims[{i}].{f}");
        check_required(&at("claimType"), &c.claim_type, issues);
        check_required(&at("issuer"), &c.issuer, issues);
        check_required(&at("value"), &c.value, issues);
    }
}
