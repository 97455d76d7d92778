use safari_core::EncounterId;

/// All errors that can be returned by an EncounterStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The single-active-per-owner rule would be violated by an insert.
    #[error("owner {owner_id} already has an active encounter")]
    OwnerHasActive { owner_id: String },

    /// No encounter with the given (id, owner) pair.
    #[error("encounter not found: {encounter_id} (owner {owner_id})")]
    NotFound {
        encounter_id: EncounterId,
        owner_id: String,
    },

    /// Optimistic concurrency conflict: another write committed first.
    /// The expected version (or the required status) was not found.
    #[error("version conflict on encounter {encounter_id}: expected version {expected_version}")]
    VersionConflict {
        encounter_id: EncounterId,
        expected_version: i64,
    },

    /// A backend-specific storage error (connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
