//! In-memory reference backend.
//!
//! One mutex guards both tables, so every trait method is a single
//! critical section and the atomicity contract in
//! [`EncounterStore`](crate::EncounterStore) holds trivially. Suitable
//! for tests and single-process deployments; a relational backend would
//! express the same conditions as conditional UPDATEs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use safari_core::{Encounter, EncounterId, EncounterStatus, MinigameAttempt};

use crate::error::StorageError;
use crate::record::{EncounterRecord, NewEncounter, OwnerCounts};
use crate::traits::EncounterStore;

#[derive(Default)]
struct Tables {
    next_id: i64,
    encounters: HashMap<EncounterId, EncounterRecord>,
    attempts: HashMap<EncounterId, Vec<MinigameAttempt>>,
}

/// Memory-backed [`EncounterStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn get_mut_checked(
        &mut self,
        owner_id: &str,
        encounter_id: EncounterId,
    ) -> Result<&mut EncounterRecord, StorageError> {
        match self.encounters.get_mut(&encounter_id) {
            Some(rec) if rec.encounter.owner_id == owner_id => Ok(rec),
            _ => Err(StorageError::NotFound {
                encounter_id,
                owner_id: owner_id.to_string(),
            }),
        }
    }
}

#[async_trait]
impl EncounterStore for MemoryStore {
    async fn insert_encounter(
        &self,
        encounter: NewEncounter,
    ) -> Result<EncounterRecord, StorageError> {
        let mut tables = self.inner.lock().await;

        let has_active = tables.encounters.values().any(|rec| {
            rec.encounter.owner_id == encounter.owner_id
                && rec.encounter.status == EncounterStatus::Active
        });
        if has_active {
            return Err(StorageError::OwnerHasActive {
                owner_id: encounter.owner_id,
            });
        }

        tables.next_id += 1;
        let id = EncounterId(tables.next_id);
        let record = EncounterRecord {
            encounter: Encounter {
                id,
                owner_id: encounter.owner_id,
                species: encounter.species,
                status: EncounterStatus::Active,
                max_attempts: encounter.max_attempts,
                attempts_used: 0,
                nickname: None,
                spawned_at: encounter.spawned_at,
                completed_at: None,
            },
            version: 0,
        };
        tables.encounters.insert(id, record.clone());
        Ok(record)
    }

    async fn find_active(&self, owner_id: &str) -> Result<Option<EncounterRecord>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables
            .encounters
            .values()
            .find(|rec| {
                rec.encounter.owner_id == owner_id
                    && rec.encounter.status == EncounterStatus::Active
            })
            .cloned())
    }

    async fn find_by_id(
        &self,
        owner_id: &str,
        encounter_id: EncounterId,
    ) -> Result<Option<EncounterRecord>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables
            .encounters
            .get(&encounter_id)
            .filter(|rec| rec.encounter.owner_id == owner_id)
            .cloned())
    }

    async fn record_attempt(
        &self,
        owner_id: &str,
        encounter_id: EncounterId,
        expected_version: i64,
        attempt: MinigameAttempt,
        new_status: EncounterStatus,
        completed_at: Option<String>,
    ) -> Result<EncounterRecord, StorageError> {
        let mut tables = self.inner.lock().await;
        let rec = tables.get_mut_checked(owner_id, encounter_id)?;

        if rec.encounter.status != EncounterStatus::Active || rec.version != expected_version {
            return Err(StorageError::VersionConflict {
                encounter_id,
                expected_version,
            });
        }
        if rec.encounter.attempts_used >= rec.encounter.max_attempts {
            // Unreachable through the engine; kept as a backend guard on I2.
            return Err(StorageError::VersionConflict {
                encounter_id,
                expected_version,
            });
        }

        rec.encounter.attempts_used += 1;
        rec.encounter.status = new_status;
        if rec.encounter.completed_at.is_none() {
            rec.encounter.completed_at = completed_at;
        }
        rec.version += 1;
        let updated = rec.clone();

        tables.attempts.entry(encounter_id).or_default().push(attempt);
        Ok(updated)
    }

    async fn transition(
        &self,
        owner_id: &str,
        encounter_id: EncounterId,
        expected_version: i64,
        from: EncounterStatus,
        to: EncounterStatus,
        completed_at: String,
    ) -> Result<EncounterRecord, StorageError> {
        let mut tables = self.inner.lock().await;
        let rec = tables.get_mut_checked(owner_id, encounter_id)?;

        if rec.encounter.status != from || rec.version != expected_version {
            return Err(StorageError::VersionConflict {
                encounter_id,
                expected_version,
            });
        }

        rec.encounter.status = to;
        if to.is_terminal() && rec.encounter.completed_at.is_none() {
            rec.encounter.completed_at = Some(completed_at);
        }
        rec.version += 1;
        Ok(rec.clone())
    }

    async fn set_nickname(
        &self,
        owner_id: &str,
        encounter_id: EncounterId,
        nickname: &str,
    ) -> Result<(), StorageError> {
        let mut tables = self.inner.lock().await;
        let rec = tables.get_mut_checked(owner_id, encounter_id)?;

        if rec.encounter.status != EncounterStatus::Captured {
            return Err(StorageError::VersionConflict {
                encounter_id,
                expected_version: rec.version,
            });
        }
        rec.encounter.nickname = Some(nickname.to_string());
        rec.version += 1;
        Ok(())
    }

    async fn list_for_owner(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<EncounterRecord>, StorageError> {
        let tables = self.inner.lock().await;
        let mut records: Vec<EncounterRecord> = tables
            .encounters
            .values()
            .filter(|rec| rec.encounter.owner_id == owner_id)
            .cloned()
            .collect();
        // RFC 3339 strings sort chronologically; id breaks same-instant ties.
        records.sort_by(|a, b| {
            (&b.encounter.spawned_at, b.encounter.id).cmp(&(&a.encounter.spawned_at, a.encounter.id))
        });
        records.truncate(limit);
        Ok(records)
    }

    async fn attempts_for(
        &self,
        encounter_id: EncounterId,
    ) -> Result<Vec<MinigameAttempt>, StorageError> {
        let tables = self.inner.lock().await;
        Ok(tables.attempts.get(&encounter_id).cloned().unwrap_or_default())
    }

    async fn owner_counts(&self, owner_id: &str) -> Result<OwnerCounts, StorageError> {
        let tables = self.inner.lock().await;
        let mut counts = OwnerCounts::default();
        for rec in tables.encounters.values() {
            if rec.encounter.owner_id != owner_id {
                continue;
            }
            counts.total += 1;
            match rec.encounter.status {
                EncounterStatus::Captured => {
                    counts.caught += 1;
                    if rec.encounter.species.is_rare {
                        counts.rare_caught += 1;
                    }
                }
                EncounterStatus::Fled => counts.fled += 1,
                EncounterStatus::Abandoned => counts.abandoned += 1,
                EncounterStatus::Active => {}
            }
        }
        Ok(counts)
    }
}
