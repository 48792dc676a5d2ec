//! The 7-state departure ceremony.
//!
//! ```text
//! Alive ─► Intent ─► Snapshot ─► Open ─► Contested
//!   │        │          │         │          │
//!   └────────┴──────────┴────┬────┴──────────┘
//!                            ▼
//!                          Final ─► Departed
//! ```

pub mod machine;
pub mod state;

pub use machine::CeremonyStateMachine;
pub use state::{valid_transitions, CeremonyPath, CeremonyState};
