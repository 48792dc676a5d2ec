//! Departure markers: the signed record that a departure happened.

pub mod builder;
pub mod expiry;
pub mod types;
pub mod validate;

pub use builder::MarkerBuilder;
pub use types::{
    DepartureMarker, DepartureType, IdentityClaim, LegalHold, Standing, TimestampAttestation,
    TrustEnhancers, WitnessReference,
};
pub use validate::validate;

/// JSON-LD context every marker carries.
pub const MARKER_CONTEXT: &str = "https://w3id.org/departure/v1";

/// Format version every marker carries.
pub const SPEC_VERSION: &str = "1.0";
