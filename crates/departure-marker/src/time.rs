//! Time utilities.
//!
//! Marker and proof timestamps are RFC 3339 strings in UTC with millisecond
//! precision and a `Z` suffix. The string is what gets signed, so it is kept
//! verbatim once written.

use chrono::{DateTime, SecondsFormat, Utc};

/// Return the current time as an RFC 3339 UTC string.
pub fn now_rfc3339() -> String {
    to_rfc3339(Utc::now())
}

/// Format a timestamp the way markers carry it.
pub fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp into UTC. Returns `None` if malformed.
pub fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
