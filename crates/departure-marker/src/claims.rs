//! Secondary claim records derived from marker trust enhancers.
//!
//! A [`ClaimRecord`] says only that an attachment on a marker was well
//! formed. Nothing here checks that a timestamp authority, witness or
//! issuer actually said what the record reports.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::marker::validate::check_trust_enhancers;
use crate::marker::{DepartureMarker, TrustEnhancers};

/// Which trust enhancer a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClaimKind {
    TimestampAttestation,
    WitnessAttestation,
    IdentityClaim,
}

impl ClaimKind {
    fn json_field(&self) -> &'static str {
        match self {
            Self::TimestampAttestation => "timestampAttestations",
            Self::WitnessAttestation => "witnessAttestations",
            Self::IdentityClaim => "identityClaims",
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_field())
    }
}

/// The only status a derived record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    StructurallyValid,
}

/// One index entry for one trust enhancer on one marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub marker_id: String,
    pub subject: String,
    pub kind: ClaimKind,
    /// Timestamp authority, witness DID, or claim issuer.
    pub asserted_by: String,
    /// Token, statement, or claim value.
    pub value: String,
    /// When the enhancer says it was made, if it says.
    pub asserted_at: Option<String>,
    pub status: ClaimStatus,
}

/// Derive index records from a marker's trust enhancers.
///
/// Malformed entries are skipped; the rest are tagged
/// [`ClaimStatus::StructurallyValid`].
pub fn derive_claims(marker: &DepartureMarker) -> Vec<ClaimRecord> {
    let Some(enhancers) = &marker.trust_enhancers else {
        return Vec::new();
    };
    let malformed = malformed_entries(enhancers);
    let record = |kind: ClaimKind, asserted_by: &str, value: &str, at: Option<&str>| ClaimRecord {
        marker_id: marker.id.clone(),
        subject: marker.subject.clone(),
        kind,
        asserted_by: asserted_by.to_string(),
        value: value.to_string(),
        asserted_at: at.map(str::to_string),
        status: ClaimStatus::StructurallyValid,
    };

    let mut records = Vec::new();
    for (i, ts) in enhancers.timestamp_attestations.iter().enumerate() {
        if !malformed.contains(&(ClaimKind::TimestampAttestation, i)) {
            records.push(record(
                ClaimKind::TimestampAttestation,
                &ts.authority,
                &ts.token,
                Some(ts.timestamp.as_str()),
            ));
        }
    }
    for (i, w) in enhancers.witness_attestations.iter().enumerate() {
        if !malformed.contains(&(ClaimKind::WitnessAttestation, i)) {
            records.push(record(
                ClaimKind::WitnessAttestation,
                &w.witness,
                w.statement.as_deref().unwrap_or_default(),
                Some(w.attested_at.as_str()),
            ));
        }
    }
    for (i, c) in enhancers.identity_claims.iter().enumerate() {
        if !malformed.contains(&(ClaimKind::IdentityClaim, i)) {
            records.push(record(ClaimKind::IdentityClaim, &c.issuer, &c.value, None));
        }
    }
    log::debug!(
        "derived {} claim records from marker {}",
        records.len(),
        marker.id
    );
    records
}

/// (kind, index) of every entry with at least one validation issue.
fn malformed_entries(enhancers: &TrustEnhancers) -> Vec<(ClaimKind, usize)> {
    let mut issues = Vec::new();
    check_trust_enhancers(enhancers, &mut issues);
    let kinds = [
        ClaimKind::TimestampAttestation,
        ClaimKind::WitnessAttestation,
        ClaimKind::IdentityClaim,
    ];
    issues
        .iter()
        .filter_map(|issue| {
            let rest = issue.field.strip_prefix("trustEnhancers.")?;
            let (field, rest) = rest.split_once('[')?;
            let (index, _) = rest.split_once(']')?;
            let kind = kinds.into_iter().find(|k| k.json_field() == field)?;
            Some((kind, index.parse().ok()?))
        })
        .collect()
}

/// Secondary index over derived claim records.
pub trait ClaimStore {
    /// Replace every record held for `marker_id` with `records`.
    fn put(&self, marker_id: &str, records: Vec<ClaimRecord>) -> Result<()>;

    fn by_marker(&self, marker_id: &str) -> Result<Vec<ClaimRecord>>;

    fn by_subject(&self, subject: &str) -> Result<Vec<ClaimRecord>>;

    /// Records whose `asserted_by` equals `party`.
    fn by_asserter(&self, party: &str) -> Result<Vec<ClaimRecord>>;

    fn remove(&self, marker_id: &str) -> Result<()>;

    /// Derive and store the records for one marker.
    fn index_marker(&self, marker: &DepartureMarker) -> Result<usize> {
        let records = derive_claims(marker);
        let count = records.len();
        self.put(&marker.id, records)?;
        Ok(count)
    }
}

/// In-memory claim index.
///
/// Records live once, keyed by marker id; subject and asserter lookups go
/// through secondary maps of marker ids.
#[derive(Default)]
pub struct MemoryClaimStore {
    inner: RwLock<ClaimIndex>,
}

#[derive(Default)]
struct ClaimIndex {
    by_marker: HashMap<String, Vec<ClaimRecord>>,
    by_subject: HashMap<String, Vec<String>>,
    by_asserter: HashMap<String, Vec<String>>,
}

impl ClaimIndex {
    fn unlink(&mut self, marker_id: &str) {
        let Some(old) = self.by_marker.remove(marker_id) else {
            return;
        };
        for r in &old {
            for (map, key) in [
                (&mut self.by_subject, &r.subject),
                (&mut self.by_asserter, &r.asserted_by),
            ] {
                if let Some(ids) = map.get_mut(key) {
                    ids.retain(|id| id != marker_id);
                    if ids.is_empty() {
                        map.remove(key);
                    }
                }
            }
        }
    }

    fn collect(
        &self,
        ids: Option<&Vec<String>>,
        keep: impl Fn(&ClaimRecord) -> bool,
    ) -> Vec<ClaimRecord> {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.by_marker.get(id))
            .flatten()
            .filter(|r| keep(r))
            .cloned()
            .collect()
    }
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClaimStore for MemoryClaimStore {
    fn put(&self, marker_id: &str, records: Vec<ClaimRecord>) -> Result<()> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let index = &mut *guard;
        index.unlink(marker_id);
        if records.is_empty() {
            return Ok(());
        }
        for r in &records {
            for (map, key) in [
                (&mut index.by_subject, &r.subject),
                (&mut index.by_asserter, &r.asserted_by),
            ] {
                let ids = map.entry(key.clone()).or_default();
                if !ids.iter().any(|id| id == marker_id) {
                    ids.push(marker_id.to_string());
                }
            }
        }
        index.by_marker.insert(marker_id.to_string(), records);
        Ok(())
    }

    fn by_marker(&self, marker_id: &str) -> Result<Vec<ClaimRecord>> {
        let index = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(index.by_marker.get(marker_id).cloned().unwrap_or_default())
    }

    fn by_subject(&self, subject: &str) -> Result<Vec<ClaimRecord>> {
        let index = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(index.collect(index.by_subject.get(subject), |r| r.subject == subject))
    }

    fn by_asserter(&self, party: &str) -> Result<Vec<ClaimRecord>> {
        let index = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(index.collect(index.by_asserter.get(party), |r| r.asserted_by == party))
    }

    fn remove(&self, marker_id: &str) -> Result<()> {
        let mut index = self.inner.write().unwrap_or_else(|e| e.into_inner());
        index.unlink(marker_id);
        Ok(())
    }
}
