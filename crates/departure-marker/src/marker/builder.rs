//! Marker construction.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::canonical;
use crate::error::{MarkerError, Result};
use crate::proof::DataIntegrityProof;

use super::types::{DepartureMarker, DepartureType, LegalHold, Standing, TrustEnhancers};
use super::validate::validate;
use super::{MARKER_CONTEXT, SPEC_VERSION};

/// Builder for unsigned departure markers.
///
/// `build` validates every field at once and fails with the complete issue
/// list; a built marker already carries its content-addressed `id`.
pub struct MarkerBuilder {
    subject: String,
    origin: String,
    departure_type: DepartureType,
    standing: Standing,
    self_attested: bool,
    timestamp: Option<String>,
    emergency_justification: Option<String>,
    legal_hold: Option<LegalHold>,
    expires: Option<String>,
    modules: BTreeMap<String, Value>,
    trust_enhancers: Option<TrustEnhancers>,
}

impl MarkerBuilder {
    /// Start a marker for `subject` leaving `origin`.
    ///
    /// Defaults: standing `unverified`, self-attested, timestamp = now.
    pub fn new(
        subject: impl Into<String>,
        origin: impl Into<String>,
        departure_type: DepartureType,
    ) -> Self {
        Self {
            subject: subject.into(),
            origin: origin.into(),
            departure_type,
            standing: Standing::Unverified,
            self_attested: true,
            timestamp: None,
            emergency_justification: None,
            legal_hold: None,
            expires: None,
            modules: BTreeMap::new(),
            trust_enhancers: None,
        }
    }

    pub fn standing(mut self, standing: Standing) -> Self {
        self.standing = standing;
        self
    }

    pub fn self_attested(mut self, self_attested: bool) -> Self {
        self.self_attested = self_attested;
        self
    }

    /// Override the departure time (RFC 3339).
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn emergency_justification(mut self, justification: impl Into<String>) -> Self {
        self.emergency_justification = Some(justification.into());
        self
    }

    pub fn legal_hold(mut self, hold: LegalHold) -> Self {
        self.legal_hold = Some(hold);
        self
    }

    pub fn expires(mut self, expires: impl Into<String>) -> Self {
        self.expires = Some(expires.into());
        self
    }

    /// Attach an opaque extension module.
    pub fn module(mut self, name: impl Into<String>, value: Value) -> Self {
        self.modules.insert(name.into(), value);
        self
    }

    pub fn trust_enhancers(mut self, enhancers: TrustEnhancers) -> Self {
        self.trust_enhancers = Some(enhancers);
        self
    }

    /// Validate and assemble the marker.
    pub fn build(self) -> Result<DepartureMarker> {
        let mut marker = DepartureMarker {
            context: MARKER_CONTEXT.to_string(),
            spec_version: SPEC_VERSION.to_string(),
            id: String::new(),
            subject: self.subject,
            origin: self.origin,
            timestamp: self.timestamp.unwrap_or_else(crate::time::now_rfc3339),
            departure_type: self.departure_type,
            standing: self.standing,
            self_attested: self.self_attested,
            proof: DataIntegrityProof::placeholder(),
            emergency_justification: self.emergency_justification,
            legal_hold: self.legal_hold,
            expires: self.expires,
            modules: (!self.modules.is_empty()).then_some(self.modules),
            trust_enhancers: self.trust_enhancers.filter(|t| !t.is_empty()),
        };

        let issues = validate(&marker);
        if !issues.is_empty() {
            return Err(MarkerError::Validation(issues));
        }

        marker.id = canonical::compute_id(&marker)?;
        log::debug!(
            "built {} marker {} for {}",
            marker.departure_type,
            marker.id,
            marker.subject
        );
        Ok(marker)
    }
}
