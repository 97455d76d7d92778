use async_trait::async_trait;

use safari_core::{EncounterId, EncounterStatus, MinigameAttempt};

use crate::error::StorageError;
use crate::record::{EncounterRecord, NewEncounter, OwnerCounts};

/// Durable store of encounters and their capture attempts.
///
/// ## Atomicity contract
///
/// The engine's check-then-act sequences are collapsed into single
/// conditional writes here, so a backend can implement each mutating
/// method as one transaction (or one conditional UPDATE):
///
/// - [`insert_encounter`](EncounterStore::insert_encounter) atomically
///   enforces the one-active-per-owner rule.
/// - [`record_attempt`](EncounterStore::record_attempt) appends the
///   attempt row, increments the attempt counter, and applies the
///   optional terminal transition in one step, conditional on
///   `status = Active` and the expected version.
/// - [`transition`](EncounterStore::transition) is a conditional
///   status change keyed on the current status and version.
///
/// A failed condition returns [`StorageError::VersionConflict`]; the
/// caller re-reads and reports whatever precondition the winning write
/// left violated. Operations for different owners must not contend
/// beyond the backend's internal locking.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync + 'static` to be shared across
/// async task boundaries in axum application state.
#[async_trait]
pub trait EncounterStore: Send + Sync + 'static {
    /// Insert a new `Active` encounter, assigning its id.
    ///
    /// Returns `Err(StorageError::OwnerHasActive)` if the owner already
    /// has an active encounter. The check and the insert are atomic.
    async fn insert_encounter(
        &self,
        encounter: NewEncounter,
    ) -> Result<EncounterRecord, StorageError>;

    /// The owner's single active encounter, if any. No side effects.
    async fn find_active(&self, owner_id: &str) -> Result<Option<EncounterRecord>, StorageError>;

    /// Look up an encounter by id, scoped to its owner.
    async fn find_by_id(
        &self,
        owner_id: &str,
        encounter_id: EncounterId,
    ) -> Result<Option<EncounterRecord>, StorageError>;

    /// Record one capture attempt: append the attempt row, increment
    /// `attempts_used`, and move to `new_status` (which may remain
    /// `Active`), all conditional on `status = Active` and
    /// `version = expected_version`.
    ///
    /// `attempt.attempt_number` must be `attempts_used + 1` as read at
    /// `expected_version`; the version condition makes that race-free.
    /// `completed_at` must be `Some` exactly when `new_status` is
    /// terminal.
    async fn record_attempt(
        &self,
        owner_id: &str,
        encounter_id: EncounterId,
        expected_version: i64,
        attempt: MinigameAttempt,
        new_status: EncounterStatus,
        completed_at: Option<String>,
    ) -> Result<EncounterRecord, StorageError>;

    /// Conditional status change `from -> to`, keyed on the current
    /// status and version. Sets `completed_at` when `to` is terminal.
    async fn transition(
        &self,
        owner_id: &str,
        encounter_id: EncounterId,
        expected_version: i64,
        from: EncounterStatus,
        to: EncounterStatus,
        completed_at: String,
    ) -> Result<EncounterRecord, StorageError>;

    /// Set the nickname on a `Captured` encounter. Rejected (as
    /// `VersionConflict`) in any other status; terminal states are
    /// otherwise frozen.
    async fn set_nickname(
        &self,
        owner_id: &str,
        encounter_id: EncounterId,
        nickname: &str,
    ) -> Result<(), StorageError>;

    /// Up to `limit` encounters for the owner, newest spawn first.
    async fn list_for_owner(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<EncounterRecord>, StorageError>;

    /// All attempt rows for an encounter, in attempt order.
    async fn attempts_for(
        &self,
        encounter_id: EncounterId,
    ) -> Result<Vec<MinigameAttempt>, StorageError>;

    /// Aggregate counts over the owner's full history.
    async fn owner_counts(&self, owner_id: &str) -> Result<OwnerCounts, StorageError>;
}
