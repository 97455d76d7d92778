//! Encounter entity and its capture-attempt children.

use serde::{Deserialize, Serialize};

use crate::species::SpeciesSnapshot;

/// Opaque encounter identifier, assigned by the store at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncounterId(pub i64);

impl std::fmt::Display for EncounterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of an encounter.
///
/// `Active` is the only non-terminal state. Transitions are one-way:
/// once an encounter is `Captured`, `Fled`, or `Abandoned` no field other
/// than the nickname (and only while `Captured`) may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncounterStatus {
    Active,
    Captured,
    Fled,
    Abandoned,
}

impl EncounterStatus {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(self) -> bool {
        !matches!(self, EncounterStatus::Active)
    }
}

/// One spawn-to-resolution episode for a single player and a single
/// wild creature.
///
/// The species fields are a snapshot taken at spawn time; a later change
/// to the species data cannot alter an in-progress encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encounter {
    pub id: EncounterId,
    pub owner_id: String,
    pub species: SpeciesSnapshot,
    pub status: EncounterStatus,
    pub max_attempts: u8,
    pub attempts_used: u8,
    pub nickname: Option<String>,
    /// RFC 3339.
    pub spawned_at: String,
    /// RFC 3339. Set exactly once, when status leaves `Active`.
    pub completed_at: Option<String>,
}

impl Encounter {
    pub fn attempts_remaining(&self) -> u8 {
        self.max_attempts.saturating_sub(self.attempts_used)
    }
}

/// One scored try at capturing the creature. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinigameAttempt {
    pub encounter_id: EncounterId,
    /// 1-based, strictly increasing per encounter, no gaps.
    pub attempt_number: u8,
    /// Caller-supplied; 0-100 by contract but not rejected outside it.
    pub score: i32,
    pub outcome: bool,
    /// RFC 3339.
    pub attempted_at: String,
}
