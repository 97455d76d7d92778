//! safari-engine: the encounter lifecycle engine.
//!
//! Sits between the domain model (`safari-core`) and a durable
//! [`EncounterStore`](safari_storage::EncounterStore), and talks to the
//! two external collaborators (the species provider and the collection
//! store) through adapter traits with HTTP implementations.
//!
//! The engine owns the state machine: spawn, inspect-active,
//! attempt-capture, commit-to-collection, abandon, history, and
//! aggregate stats. Callers arrive already authenticated; the engine
//! receives an opaque [`Identity`] and never parses credentials.

pub mod cache;
pub mod collection;
pub mod engine;
pub mod error;
pub mod species;
pub mod types;

pub use cache::TtlCache;
pub use collection::{CollectionClient, CommitPayload, CommittedInstance, HttpCollectionClient};
pub use engine::EncounterEngine;
pub use error::{DependencyError, EngineError};
pub use species::{HttpSpeciesProvider, SpeciesProvider, SpeciesRecord};
pub use types::{
    CatchOutcome, CollectOutcome, EncounterView, HistoryEntry, Identity, OwnerStats, PokemonView,
    SkipOutcome, SpawnRequest,
};
