//! Ceremony states and the legal transition table.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CeremonyState {
    Alive,
    Intent,
    Snapshot,
    Open,
    Contested,
    Final,
    Departed,
}

impl CeremonyState {
    pub const ALL: [CeremonyState; 7] = [
        Self::Alive,
        Self::Intent,
        Self::Snapshot,
        Self::Open,
        Self::Contested,
        Self::Final,
        Self::Departed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alive => "alive",
            Self::Intent => "intent",
            Self::Snapshot => "snapshot",
            Self::Open => "open",
            Self::Contested => "contested",
            Self::Final => "final",
            Self::Departed => "departed",
        }
    }

    pub fn is_terminal(self) -> bool {
        valid_transitions(self).is_empty()
    }

    pub fn can_transition_to(self, to: CeremonyState) -> bool {
        valid_transitions(self).contains(&to)
    }
}

impl fmt::Display for CeremonyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal next states. `Alive` and `Intent` may jump to `Final` for
/// emergencies; `Departed` has none.
pub fn valid_transitions(state: CeremonyState) -> &'static [CeremonyState] {
    use CeremonyState::*;
    match state {
        Alive => &[Intent, Final],
        Intent => &[Snapshot, Final],
        Snapshot => &[Open, Final],
        Open => &[Contested, Final],
        Contested => &[Final],
        Final => &[Departed],
        Departed => &[],
    }
}

/// Which route a ceremony took to `Final`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CeremonyPath {
    /// Signed from `Snapshot`.
    Cooperative,
    /// Signed from `Open`: the challenge window closed without a contest.
    Unilateral,
    /// Signed from `Contested`.
    Contested,
    /// Signed from `Alive` or `Intent`.
    Emergency,
}

impl fmt::Display for CeremonyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cooperative => "cooperative",
            Self::Unilateral => "unilateral",
            Self::Contested => "contested",
            Self::Emergency => "emergency",
        })
    }
}
