use serde::{Deserialize, Serialize};

use safari_core::{Encounter, SpeciesSnapshot};

/// A stored encounter plus its concurrency token.
///
/// `version` starts at 0 on insert and is bumped by every conditional
/// write; it is never exposed outside the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterRecord {
    pub encounter: Encounter,
    pub version: i64,
}

/// Insert payload for a freshly spawned encounter. The store assigns
/// the id and sets `status = Active`, `attempts_used = 0`, `version = 0`.
#[derive(Debug, Clone)]
pub struct NewEncounter {
    pub owner_id: String,
    pub species: SpeciesSnapshot,
    pub max_attempts: u8,
    /// RFC 3339.
    pub spawned_at: String,
}

/// Aggregate counts for one owner's encounter history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerCounts {
    pub total: u64,
    pub caught: u64,
    pub fled: u64,
    pub abandoned: u64,
    /// Rare variants among *captured* encounters only.
    pub rare_caught: u64,
}
