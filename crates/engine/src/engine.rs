//! The encounter lifecycle state machine.
//!
//! Every operation is a request-scoped unit of work: read, decide,
//! apply one conditional write. Serializability per owner comes from
//! the store's conditional writes: a losing racer re-reads and
//! reports the precondition the winner left violated.

use std::sync::Arc;

use safari_core::capture::{DEFAULT_MAX_SPECIES_ID, MAX_ATTEMPTS, RARE_CHANCE};
use safari_core::{
    clamp_max_species_id, roll_catch, EncounterId, EncounterStatus, MinigameAttempt, RandomSource,
    SpeciesSnapshot,
};
use safari_storage::{EncounterStore, NewEncounter, StorageError};

use crate::collection::{CollectionClient, CommitPayload};
use crate::error::EngineError;
use crate::species::SpeciesProvider;
use crate::types::{
    encounter_view, history_entry, CatchOutcome, CollectOutcome, EncounterView, HistoryEntry,
    Identity, OwnerStats, PokemonView, SkipOutcome, SpawnRequest,
};

/// Default page size for history queries.
const DEFAULT_HISTORY_LIMIT: usize = 20;

/// How many times a conditional write is retried when a concurrent
/// writer moved the version but left the precondition satisfiable.
const CONFLICT_RETRIES: u32 = 4;

/// Newly committed collection entries start with no experience.
const STARTING_EXPERIENCE: u32 = 0;

/// Commit assigns a uniformly random level in this inclusive range.
const LEVEL_RANGE: (u32, u32) = (1, 20);

pub struct EncounterEngine<S> {
    store: S,
    species: Arc<dyn SpeciesProvider>,
    collection: Arc<dyn CollectionClient>,
    rng: Arc<dyn RandomSource>,
}

impl<S: EncounterStore> EncounterEngine<S> {
    pub fn new(
        store: S,
        species: Arc<dyn SpeciesProvider>,
        collection: Arc<dyn CollectionClient>,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            store,
            species,
            collection,
            rng,
        }
    }

    /// The backing store, mainly for inspection in tests.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Spawn a wild encounter for the owner.
    ///
    /// Fails with [`EngineError::AlreadyActive`] while a previous
    /// encounter is unresolved, and with [`EngineError::Dependency`]
    /// when the species lookup fails, in which case nothing is
    /// created.
    pub async fn spawn(
        &self,
        who: &Identity,
        request: SpawnRequest,
    ) -> Result<EncounterView, EngineError> {
        // Fast precheck; the insert below re-enforces the rule
        // atomically against concurrent spawns.
        if self.store.find_active(&who.owner_id).await?.is_some() {
            return Err(EngineError::AlreadyActive);
        }

        let species_id = match request.species_id {
            Some(id) => id,
            None => {
                let max_id =
                    clamp_max_species_id(request.max_species_id.unwrap_or(DEFAULT_MAX_SPECIES_ID));
                self.rng.pick(1, max_id)
            }
        };
        let species = self.species.fetch(species_id).await?;

        let is_rare = self.rng.chance(RARE_CHANCE);
        let sprite = species.sprites.pick(is_rare);

        let stored = self
            .store
            .insert_encounter(NewEncounter {
                owner_id: who.owner_id.clone(),
                species: SpeciesSnapshot {
                    species_id: species.id,
                    name: species.name,
                    sprite,
                    is_rare,
                    capture_rate: species.capture_rate,
                },
                max_attempts: MAX_ATTEMPTS,
                spawned_at: now_rfc3339(),
            })
            .await?;

        Ok(encounter_view(&stored.encounter))
    }

    /// The owner's single active encounter. No side effects.
    pub async fn get_active(&self, who: &Identity) -> Result<EncounterView, EngineError> {
        let record = self
            .store
            .find_active(&who.owner_id)
            .await?
            .ok_or(EngineError::NoActiveEncounter)?;
        Ok(encounter_view(&record.encounter))
    }

    /// Resolve one capture attempt against the active encounter.
    pub async fn attempt_capture(
        &self,
        who: &Identity,
        encounter_id: EncounterId,
        score: i32,
    ) -> Result<CatchOutcome, EngineError> {
        for _ in 0..CONFLICT_RETRIES {
            let record = self
                .store
                .find_by_id(&who.owner_id, encounter_id)
                .await?
                .ok_or(EngineError::NoActiveEncounter)?;
            let encounter = &record.encounter;

            if encounter.status != EncounterStatus::Active {
                return Err(EngineError::NoActiveEncounter);
            }
            if encounter.attempts_used >= encounter.max_attempts {
                return Err(EngineError::NoAttemptsRemaining);
            }

            let success = roll_catch(score, encounter.species.capture_rate, self.rng.as_ref());
            let attempt_number = encounter.attempts_used + 1;
            let new_status = if success {
                EncounterStatus::Captured
            } else if attempt_number == encounter.max_attempts {
                EncounterStatus::Fled
            } else {
                EncounterStatus::Active
            };

            let now = now_rfc3339();
            let completed_at = new_status.is_terminal().then(|| now.clone());
            let attempt = MinigameAttempt {
                encounter_id,
                attempt_number,
                score,
                outcome: success,
                attempted_at: now,
            };

            match self
                .store
                .record_attempt(
                    &who.owner_id,
                    encounter_id,
                    record.version,
                    attempt,
                    new_status,
                    completed_at,
                )
                .await
            {
                Ok(updated) => return Ok(catch_outcome(success, &updated.encounter)),
                // A concurrent write won; re-read and either report the
                // precondition it left violated or try again.
                Err(StorageError::VersionConflict { .. }) => continue,
                Err(StorageError::NotFound { .. }) => return Err(EngineError::NoActiveEncounter),
                Err(other) => return Err(other.into()),
            }
        }

        Err(EngineError::Storage(StorageError::Backend(
            "conflict retry budget exhausted".to_string(),
        )))
    }

    /// Commit a captured creature into the owner's collection.
    ///
    /// The encounter stays `Captured` whether or not the collaborator
    /// call succeeds, so a failed commit is retryable by re-invoking.
    pub async fn commit_to_collection(
        &self,
        who: &Identity,
        encounter_id: EncounterId,
        nickname: Option<String>,
    ) -> Result<CollectOutcome, EngineError> {
        let record = self
            .store
            .find_by_id(&who.owner_id, encounter_id)
            .await?
            .ok_or(EngineError::NoCapturedEncounter)?;
        if record.encounter.status != EncounterStatus::Captured {
            return Err(EngineError::NoCapturedEncounter);
        }

        if let Some(nick) = &nickname {
            // Best-effort: a lost nickname write must not block the commit.
            let _ = self
                .store
                .set_nickname(&who.owner_id, encounter_id, nick)
                .await;
        }

        let species = &record.encounter.species;
        let payload = CommitPayload {
            pokemon_id: species.species_id,
            level: self.rng.pick(LEVEL_RANGE.0, LEVEL_RANGE.1) as u8,
            nickname: nickname.clone(),
            is_shiny: species.is_rare,
            experience: STARTING_EXPERIENCE,
            gender: draw_gender(self.rng.as_ref()),
            ability: None,
            held_item: None,
        };

        let committed = self
            .collection
            .commit(&who.owner_id, payload, who.bearer.as_deref())
            .await?;

        let message = match &nickname {
            Some(nick) => format!(
                "{} ({}) was added to your collection!",
                nick, species.name
            ),
            None => format!("{} was added to your collection!", species.name),
        };
        Ok(CollectOutcome {
            success: true,
            message,
            collection_id: committed.id,
        })
    }

    /// Walk away from the active encounter.
    pub async fn abandon(
        &self,
        who: &Identity,
        encounter_id: EncounterId,
    ) -> Result<SkipOutcome, EngineError> {
        for _ in 0..CONFLICT_RETRIES {
            let record = self
                .store
                .find_by_id(&who.owner_id, encounter_id)
                .await?
                .ok_or(EngineError::NoActiveEncounter)?;
            if record.encounter.status != EncounterStatus::Active {
                return Err(EngineError::NoActiveEncounter);
            }

            match self
                .store
                .transition(
                    &who.owner_id,
                    encounter_id,
                    record.version,
                    EncounterStatus::Active,
                    EncounterStatus::Abandoned,
                    now_rfc3339(),
                )
                .await
            {
                Ok(updated) => {
                    return Ok(SkipOutcome {
                        success: true,
                        message: format!(
                            "You ran away from {}",
                            updated.encounter.species.name
                        ),
                    })
                }
                Err(StorageError::VersionConflict { .. }) => continue,
                Err(StorageError::NotFound { .. }) => return Err(EngineError::NoActiveEncounter),
                Err(other) => return Err(other.into()),
            }
        }

        Err(EngineError::Storage(StorageError::Backend(
            "conflict retry budget exhausted".to_string(),
        )))
    }

    /// The owner's most recent encounters, newest spawn first.
    pub async fn history(
        &self,
        who: &Identity,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, EngineError> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        let records = self.store.list_for_owner(&who.owner_id, limit).await?;
        Ok(records.iter().map(|r| history_entry(&r.encounter)).collect())
    }

    /// Aggregate counts over the owner's full history.
    pub async fn stats(&self, who: &Identity) -> Result<OwnerStats, EngineError> {
        let counts = self.store.owner_counts(&who.owner_id).await?;
        let catch_rate = if counts.total > 0 {
            ((counts.caught as f64 / counts.total as f64) * 100.0).round() as u32
        } else {
            0
        };
        Ok(OwnerStats {
            total: counts.total,
            caught: counts.caught,
            fled: counts.fled,
            abandoned: counts.abandoned,
            rare: counts.rare_caught,
            catch_rate,
        })
    }
}

fn catch_outcome(success: bool, encounter: &safari_core::Encounter) -> CatchOutcome {
    let species = &encounter.species;
    if success {
        return CatchOutcome {
            success: true,
            caught: true,
            fled: None,
            message: format!("You caught {}!", species.name),
            pokemon: Some(PokemonView {
                id: species.species_id,
                name: species.name.clone(),
                sprite: species.sprite.clone(),
                is_shiny: species.is_rare,
                capture_rate: None,
            }),
            encounter_id: Some(encounter.id),
            attempts_remaining: None,
        };
    }

    if encounter.status == EncounterStatus::Fled {
        return CatchOutcome {
            success: false,
            caught: false,
            fled: Some(true),
            message: format!("{} fled!", species.name),
            pokemon: None,
            encounter_id: None,
            attempts_remaining: Some(0),
        };
    }

    CatchOutcome {
        success: false,
        caught: false,
        fled: Some(false),
        message: "The Pokemon broke free!".to_string(),
        pokemon: None,
        encounter_id: None,
        attempts_remaining: Some(encounter.attempts_remaining()),
    }
}

fn draw_gender(rng: &dyn RandomSource) -> String {
    if rng.chance(0.5) { "male" } else { "female" }.to_string()
}

/// Current time as RFC 3339, truncated to whole seconds so the stored
/// strings are fixed-width and order lexicographically.
fn now_rfc3339() -> String {
    let now = time::OffsetDateTime::now_utc();
    now.replace_nanosecond(0)
        .unwrap_or(now)
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}
