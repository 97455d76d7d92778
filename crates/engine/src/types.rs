//! Engine inputs and the projected shapes operations return.
//!
//! The output structs double as HTTP response bodies, so field names
//! serialize in the wire's camelCase.

use serde::Serialize;

use safari_core::{Encounter, EncounterId, EncounterStatus};

/// Opaque authenticated identity, established by an upstream gate.
///
/// The engine never parses credentials; `bearer` is forwarded verbatim
/// to the collection store on commit.
#[derive(Debug, Clone)]
pub struct Identity {
    pub owner_id: String,
    pub bearer: Option<String>,
}

impl Identity {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            bearer: None,
        }
    }

    pub fn with_bearer(owner_id: impl Into<String>, bearer: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            bearer: Some(bearer.into()),
        }
    }
}

/// Spawn inputs. With no `species_id` the engine rolls one uniformly in
/// `[1, max_species_id]` (bounded by the hard ceiling).
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnRequest {
    pub species_id: Option<u32>,
    pub max_species_id: Option<u32>,
}

/// Species snapshot as presented to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PokemonView {
    pub id: u32,
    pub name: String,
    pub sprite: Option<String>,
    pub is_shiny: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_rate: Option<u8>,
}

/// Projection of an active encounter, returned by spawn and inspect.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterView {
    pub encounter_id: EncounterId,
    pub pokemon: PokemonView,
    pub attempts_remaining: u8,
}

/// Result of one capture attempt. The populated fields depend on the
/// branch taken, mirroring the wire contract: a success carries the
/// creature, a failure carries the remaining budget.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchOutcome {
    pub success: bool,
    pub caught: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fled: Option<bool>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pokemon: Option<PokemonView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter_id: Option<EncounterId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u8>,
}

/// Result of committing a captured creature to the collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectOutcome {
    pub success: bool,
    pub message: String,
    pub collection_id: String,
}

/// Confirmation of an abandoned encounter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipOutcome {
    pub success: bool,
    pub message: String,
}

/// Summary row in the owner's encounter history. No attempt detail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: EncounterId,
    pub pokemon_id: u32,
    pub pokemon_name: String,
    pub pokemon_sprite: Option<String>,
    pub is_shiny: bool,
    pub status: EncounterStatus,
    pub nickname: Option<String>,
    pub attempts_used: u8,
    pub spawned_at: String,
    pub completed_at: Option<String>,
}

/// Aggregate counts over the owner's full history.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerStats {
    pub total: u64,
    pub caught: u64,
    pub fled: u64,
    pub abandoned: u64,
    /// Rare variants among captured encounters.
    pub rare: u64,
    /// `round(caught / total * 100)`, 0 for an empty history.
    pub catch_rate: u32,
}

pub(crate) fn encounter_view(encounter: &Encounter) -> EncounterView {
    EncounterView {
        encounter_id: encounter.id,
        pokemon: PokemonView {
            id: encounter.species.species_id,
            name: encounter.species.name.clone(),
            sprite: encounter.species.sprite.clone(),
            is_shiny: encounter.species.is_rare,
            capture_rate: Some(encounter.species.capture_rate),
        },
        attempts_remaining: encounter.attempts_remaining(),
    }
}

pub(crate) fn history_entry(encounter: &Encounter) -> HistoryEntry {
    HistoryEntry {
        id: encounter.id,
        pokemon_id: encounter.species.species_id,
        pokemon_name: encounter.species.name.clone(),
        pokemon_sprite: encounter.species.sprite.clone(),
        is_shiny: encounter.species.is_rare,
        status: encounter.status,
        nickname: encounter.nickname.clone(),
        attempts_used: encounter.attempts_used,
        spawned_at: encounter.spawned_at.clone(),
        completed_at: encounter.completed_at.clone(),
    }
}
