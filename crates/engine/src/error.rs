use safari_storage::StorageError;

/// Failure talking to an external collaborator (species provider or
/// collection store). `status` carries the collaborator's HTTP status
/// when one was derivable from the transport error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct DependencyError {
    pub status: Option<u16>,
    pub message: String,
}

impl DependencyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// Domain errors surfaced by the engine. Everything here is recovered
/// at the HTTP boundary and mapped to a status code; storage errors are
/// the only variant treated as unexpected.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Spawn would violate the one-active-per-owner rule.
    #[error("You already have an active encounter")]
    AlreadyActive,

    /// No encounter in `Active` status matched the request.
    #[error("No active encounter found")]
    NoActiveEncounter,

    /// The attempt budget for this encounter is spent.
    #[error("No attempts remaining")]
    NoAttemptsRemaining,

    /// Commit requires a `Captured` encounter.
    #[error("No caught Pokemon found for this encounter")]
    NoCapturedEncounter,

    /// A collaborator call failed; the encounter state is unchanged
    /// (beyond any best-effort nickname write already applied).
    #[error("dependency failure: {0}")]
    Dependency(#[from] DependencyError),

    /// Unexpected storage failure. Not caller-fixable.
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::OwnerHasActive { .. } => EngineError::AlreadyActive,
            other => EngineError::Storage(other),
        }
    }
}
