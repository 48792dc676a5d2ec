//! Key event log with pre-rotation.
//!
//! An identifier survives key loss without a registrar: the inception event
//! commits to the digest of the next key, and each rotation must be signed by
//! a currently authorized key and may only install keys committed to by the
//! event before it.

pub mod event;
pub mod event_log;
pub mod identity;
pub mod state;

pub use event::{key_digest, InceptionEvent, KeyEvent, RotationEvent, RotationReason};
pub use event_log::{verify_key_state, KeyEventLog, SharedKeyEventLog};
pub use identity::PreRotatedIdentity;
pub use state::{is_key_compromised, KeyState, KeyStatus};
