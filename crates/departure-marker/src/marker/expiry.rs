//! Default expiry policy.
//!
//! Applied by callers that care about freshness; verification ignores it.

use chrono::{DateTime, Duration, Utc};

use crate::error::{MarkerError, Result, ValidationIssue};
use crate::time::parse_rfc3339;

use super::types::{DepartureMarker, DepartureType};

/// Validity of a voluntary departure without an explicit `expires`.
pub const VOLUNTARY_EXPIRY_DAYS: i64 = 730;

/// Validity of every other departure type without an explicit `expires`.
pub const DEFAULT_EXPIRY_DAYS: i64 = 365;

pub fn default_expiry_days(departure_type: DepartureType) -> i64 {
    match departure_type {
        DepartureType::Voluntary => VOLUNTARY_EXPIRY_DAYS,
        _ => DEFAULT_EXPIRY_DAYS,
    }
}

/// The explicit `expires`, or `timestamp` plus the default window.
pub fn effective_expiry(marker: &DepartureMarker) -> Result<DateTime<Utc>> {
    if let Some(expires) = &marker.expires {
        return parse_rfc3339(expires).ok_or_else(|| invalid("expires"));
    }
    let issued = parse_rfc3339(&marker.timestamp).ok_or_else(|| invalid("timestamp"))?;
    Ok(issued + Duration::days(default_expiry_days(marker.departure_type)))
}

pub fn is_expired(marker: &DepartureMarker, now: DateTime<Utc>) -> Result<bool> {
    Ok(now >= effective_expiry(marker)?)
}

fn invalid(field: &str) -> MarkerError {
    MarkerError::Validation(vec![ValidationIssue::new(
        field,
        "must be an RFC 3339 timestamp",
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerBuilder;

    fn marker(t: DepartureType) -> DepartureMarker {
        let mut b = MarkerBuilder::new("did:example:a", "https://a.example", t)
            .timestamp("2025-01-01T00:00:00Z");
        if t == DepartureType::Emergency {
            b = b.emergency_justification("outage");
        }
        b.build().unwrap()
    }

    #[test]
    fn test_default_windows() {
        let v = effective_expiry(&marker(DepartureType::Voluntary)).unwrap();
        assert_eq!(v, parse_rfc3339("2027-01-01T00:00:00Z").unwrap());
        let f = effective_expiry(&marker(DepartureType::Forced)).unwrap();
        assert_eq!(f, parse_rfc3339("2026-01-01T00:00:00Z").unwrap());
    }

    #[test]
    fn test_explicit_expiry_wins() {
        let mut m = marker(DepartureType::Voluntary);
        m.expires = Some("2025-02-01T00:00:00Z".into());
        let now = parse_rfc3339("2025-03-01T00:00:00Z").unwrap();
        assert!(is_expired(&m, now).unwrap());
    }

    #[test]
    fn test_not_expired_inside_window() {
        let m = marker(DepartureType::Emergency);
        let now = parse_rfc3339("2025-06-01T00:00:00Z").unwrap();
        assert!(!is_expired(&m, now).unwrap());
    }
}
