//! safari-core: domain model for the wild-encounter service.
//!
//! Holds the Encounter entity and its children, the capture probability
//! rules, and the random-source abstraction the engine draws through.
//! This crate is deliberately free of I/O so the lifecycle rules can be
//! tested without a store or a network.

pub mod capture;
pub mod encounter;
pub mod rng;
pub mod species;

pub use capture::{catch_chance, clamp_max_species_id, roll_catch};
pub use encounter::{Encounter, EncounterId, EncounterStatus, MinigameAttempt};
pub use rng::{RandomSource, SeededRandom, ThreadRandom};
pub use species::{SpeciesSnapshot, SpriteSet};
