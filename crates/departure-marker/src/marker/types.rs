//! Marker data model.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MarkerError;
use crate::proof::DataIntegrityProof;

/// Why the subject left the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DepartureType {
    Voluntary,
    Forced,
    Emergency,
    KeyCompromise,
    PlatformShutdown,
    Directed,
    Constructive,
    Acquisition,
}

impl DepartureType {
    pub const ALL: [DepartureType; 8] = [
        Self::Voluntary,
        Self::Forced,
        Self::Emergency,
        Self::KeyCompromise,
        Self::PlatformShutdown,
        Self::Directed,
        Self::Constructive,
        Self::Acquisition,
    ];

    /// The wire tag.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Voluntary => "voluntary",
            Self::Forced => "forced",
            Self::Emergency => "emergency",
            Self::KeyCompromise => "keyCompromise",
            Self::PlatformShutdown => "platformShutdown",
            Self::Directed => "directed",
            Self::Constructive => "constructive",
            Self::Acquisition => "acquisition",
        }
    }
}

impl fmt::Display for DepartureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for DepartureType {
    type Err = MarkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_tag().eq_ignore_ascii_case(s) || kebab(t.as_tag()) == s)
            .ok_or_else(|| {
                MarkerError::Validation(vec![crate::error::ValidationIssue::new(
                    "departureType",
                    format!("unknown departure type '{s}'"),
                )])
            })
    }
}

/// The subject's standing at the origin when leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Standing {
    GoodStanding,
    Disputed,
    Unverified,
}

impl Standing {
    pub const ALL: [Standing; 3] = [Self::GoodStanding, Self::Disputed, Self::Unverified];

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::GoodStanding => "goodStanding",
            Self::Disputed => "disputed",
            Self::Unverified => "unverified",
        }
    }
}

impl fmt::Display for Standing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for Standing {
    type Err = MarkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_tag().eq_ignore_ascii_case(s) || kebab(t.as_tag()) == s)
            .ok_or_else(|| {
                MarkerError::Validation(vec![crate::error::ValidationIssue::new(
                    "standing",
                    format!("unknown standing '{s}'"),
                )])
            })
    }
}

/// camelCase → kebab-case, so the CLI accepts `key-compromise`.
fn kebab(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len() + 2);
    for c in tag.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// A legal hold that applied at departure time. Recorded, never enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalHold {
    pub authority: String,
    pub reference: String,
    pub hold_type: String,
    pub date_issued: String,
    pub acknowledged: bool,
}

/// A third-party timestamp token. Opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampAttestation {
    pub authority: String,
    pub timestamp: String,
    pub token: String,
}

/// A pointer to a witness who saw the departure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WitnessReference {
    /// `did:key` of the witness.
    pub witness: String,
    pub attested_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
}

/// An identity claim asserted by some issuer about the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaim {
    pub claim_type: String,
    pub issuer: String,
    pub value: String,
}

/// Optional attachments that can raise a verifier's confidence.
///
/// They are checked for shape only. Nothing here is taken as true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustEnhancers {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timestamp_attestations: Vec<TimestampAttestation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub witness_attestations: Vec<WitnessReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identity_claims: Vec<IdentityClaim>,
}

impl TrustEnhancers {
    pub fn is_empty(&self) -> bool {
        self.timestamp_attestations.is_empty()
            && self.witness_attestations.is_empty()
            && self.identity_claims.is_empty()
    }
}

/// A departure marker.
///
/// `id` is the content address of every other field except `proof`; see
/// [`crate::canonical::compute_id`]. Unknown JSON fields are rejected so a
/// field cannot ride along outside the signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DepartureMarker {
    #[serde(rename = "@context")]
    pub context: String,
    pub spec_version: String,
    #[serde(default)]
    pub id: String,
    pub subject: String,
    pub origin: String,
    pub timestamp: String,
    pub departure_type: DepartureType,
    pub standing: Standing,
    pub self_attested: bool,
    #[serde(default)]
    pub proof: DataIntegrityProof,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_justification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_hold: Option<LegalHold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_enhancers: Option<TrustEnhancers>,
}

impl DepartureMarker {
    /// Parse marker JSON.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty JSON for distribution.
    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether the proof is still the unsigned placeholder.
    pub fn is_signed(&self) -> bool {
        !self.proof.is_placeholder()
    }
}
