//! Lifecycle scenarios against the in-memory store with stubbed
//! collaborators and a pinned random source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use safari_core::{EncounterStatus, RandomSource, SpriteSet};
use safari_engine::{
    CollectionClient, CommitPayload, CommittedInstance, DependencyError, EncounterEngine,
    EngineError, Identity, SpawnRequest, SpeciesProvider, SpeciesRecord,
};
use safari_storage::{EncounterStore, MemoryStore};

/// Random source whose unit draw is settable mid-test. `pick` always
/// returns the low bound.
struct TestRandom {
    unit: Mutex<f64>,
}

impl TestRandom {
    fn new(unit: f64) -> Arc<Self> {
        Arc::new(Self {
            unit: Mutex::new(unit),
        })
    }

    fn set_unit(&self, value: f64) {
        *self.unit.lock().unwrap() = value;
    }
}

impl RandomSource for TestRandom {
    fn unit(&self) -> f64 {
        *self.unit.lock().unwrap()
    }

    fn pick(&self, low: u32, _high: u32) -> u32 {
        low
    }
}

/// Species provider returning a fixed record for any id.
struct StubSpecies {
    capture_rate: u8,
}

#[async_trait]
impl SpeciesProvider for StubSpecies {
    async fn fetch(&self, species_id: u32) -> Result<SpeciesRecord, DependencyError> {
        Ok(SpeciesRecord {
            id: species_id,
            name: "eevee".to_string(),
            sprites: SpriteSet {
                front: Some("front.png".to_string()),
                front_shiny: Some("shiny.png".to_string()),
                alt: None,
            },
            capture_rate: self.capture_rate,
        })
    }
}

struct FailingSpecies;

#[async_trait]
impl SpeciesProvider for FailingSpecies {
    async fn fetch(&self, _species_id: u32) -> Result<SpeciesRecord, DependencyError> {
        Err(DependencyError::with_status(503, "species provider down"))
    }
}

struct RecordedCommit {
    owner_id: String,
    payload: CommitPayload,
    bearer: Option<String>,
}

/// Collection client that records calls and can be switched to fail.
struct StubCollection {
    calls: Mutex<Vec<RecordedCommit>>,
    fail: AtomicBool,
}

impl StubCollection {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl CollectionClient for StubCollection {
    async fn commit(
        &self,
        owner_id: &str,
        payload: CommitPayload,
        bearer: Option<&str>,
    ) -> Result<CommittedInstance, DependencyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DependencyError::with_status(500, "collection store down"));
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push(RecordedCommit {
            owner_id: owner_id.to_string(),
            payload,
            bearer: bearer.map(|b| b.to_string()),
        });
        Ok(CommittedInstance {
            id: format!("col-{}", calls.len()),
        })
    }
}

struct Harness {
    engine: Arc<EncounterEngine<MemoryStore>>,
    rng: Arc<TestRandom>,
    collection: Arc<StubCollection>,
}

fn harness(capture_rate: u8) -> Harness {
    let rng = TestRandom::new(0.9);
    let collection = StubCollection::new();
    let engine = Arc::new(EncounterEngine::new(
        MemoryStore::new(),
        Arc::new(StubSpecies { capture_rate }),
        collection.clone(),
        rng.clone(),
    ));
    Harness {
        engine,
        rng,
        collection,
    }
}

fn owner(name: &str) -> Identity {
    Identity::new(name)
}

#[tokio::test]
async fn full_score_captures_on_first_attempt() {
    let h = harness(45);
    let who = owner("u1");

    let view = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();
    assert_eq!(view.attempts_remaining, 3);
    assert!(!view.pokemon.is_shiny);

    let outcome = h
        .engine
        .attempt_capture(&who, view.encounter_id, 100)
        .await
        .unwrap();
    assert!(outcome.success && outcome.caught);
    assert_eq!(outcome.message, "You caught eevee!");
    assert_eq!(outcome.encounter_id, Some(view.encounter_id));

    let record = h
        .engine
        .store()
        .find_by_id("u1", view.encounter_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.encounter.status, EncounterStatus::Captured);
    assert_eq!(record.encounter.attempts_used, 1);
    assert!(record.encounter.completed_at.is_some());

    let attempts = h.engine.store().attempts_for(view.encounter_id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].attempt_number, 1);
    assert!(attempts[0].outcome);
}

#[tokio::test]
async fn exhausting_attempts_flips_to_fled_exactly_once() {
    // Capture rate 0 and score 0 make the chance exactly 0, so every
    // draw loses no matter what the random source returns.
    let h = harness(0);
    let who = owner("u1");
    let view = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();
    let id = view.encounter_id;

    let first = h.engine.attempt_capture(&who, id, 0).await.unwrap();
    assert_eq!(first.fled, Some(false));
    assert_eq!(first.attempts_remaining, Some(2));
    assert_eq!(first.message, "The Pokemon broke free!");

    let second = h.engine.attempt_capture(&who, id, 0).await.unwrap();
    assert_eq!(second.attempts_remaining, Some(1));

    let third = h.engine.attempt_capture(&who, id, 0).await.unwrap();
    assert_eq!(third.fled, Some(true));
    assert_eq!(third.attempts_remaining, Some(0));
    assert_eq!(third.message, "eevee fled!");

    let record = h.engine.store().find_by_id("u1", id).await.unwrap().unwrap();
    assert_eq!(record.encounter.status, EncounterStatus::Fled);
    assert_eq!(record.encounter.attempts_used, 3);

    // The encounter is no longer active, so a fourth attempt misses.
    let err = h.engine.attempt_capture(&who, id, 100).await.unwrap_err();
    assert!(matches!(err, EngineError::NoActiveEncounter));

    let attempts = h.engine.store().attempts_for(id).await.unwrap();
    assert_eq!(attempts.len(), 3);
    let numbers: Vec<u8> = attempts.iter().map(|a| a.attempt_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[tokio::test]
async fn second_spawn_without_resolution_conflicts() {
    let h = harness(45);
    let who = owner("u1");
    h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();

    let err = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyActive));
    assert_eq!(err.to_string(), "You already have an active encounter");
}

#[tokio::test]
async fn abandoned_encounter_rejects_further_attempts() {
    let h = harness(45);
    let who = owner("u1");
    let view = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();

    let skip = h.engine.abandon(&who, view.encounter_id).await.unwrap();
    assert!(skip.success);
    assert_eq!(skip.message, "You ran away from eevee");

    let record = h
        .engine
        .store()
        .find_by_id("u1", view.encounter_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.encounter.status, EncounterStatus::Abandoned);
    assert!(record.encounter.completed_at.is_some());

    let err = h
        .engine
        .attempt_capture(&who, view.encounter_id, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoActiveEncounter));
}

#[tokio::test]
async fn stats_aggregate_a_mixed_history() {
    let h = harness(0);
    let who = owner("u1");

    // Captured, rare: rarity draw under 1%.
    h.rng.set_unit(0.005);
    let first = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();
    assert!(first.pokemon.is_shiny);
    h.engine
        .attempt_capture(&who, first.encounter_id, 100)
        .await
        .unwrap();

    // Captured, common.
    h.rng.set_unit(0.9);
    let second = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();
    h.engine
        .attempt_capture(&who, second.encounter_id, 100)
        .await
        .unwrap();

    // Fled after three losing attempts.
    let third = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();
    for _ in 0..3 {
        h.engine
            .attempt_capture(&who, third.encounter_id, 0)
            .await
            .unwrap();
    }

    // Abandoned.
    let fourth = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();
    h.engine.abandon(&who, fourth.encounter_id).await.unwrap();

    let stats = h.engine.stats(&who).await.unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.caught, 2);
    assert_eq!(stats.fled, 1);
    assert_eq!(stats.abandoned, 1);
    assert_eq!(stats.rare, 1);
    assert_eq!(stats.catch_rate, 50);
}

#[tokio::test]
async fn empty_history_has_zero_catch_rate() {
    let h = harness(45);
    let stats = h.engine.stats(&owner("nobody")).await.unwrap();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.catch_rate, 0);
}

#[tokio::test]
async fn commit_forwards_payload_and_bearer() {
    let h = harness(45);
    let who = Identity::with_bearer("u1", "tok-1");

    // Rare spawn so the rarity flag rides through to the payload.
    h.rng.set_unit(0.005);
    let view = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();
    assert!(view.pokemon.is_shiny);
    assert_eq!(view.pokemon.sprite.as_deref(), Some("shiny.png"));

    h.engine
        .attempt_capture(&who, view.encounter_id, 100)
        .await
        .unwrap();

    let outcome = h
        .engine
        .commit_to_collection(&who, view.encounter_id, Some("Sparky".to_string()))
        .await
        .unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.collection_id, "col-1");
    assert_eq!(
        outcome.message,
        "Sparky (eevee) was added to your collection!"
    );

    let calls = h.collection.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.owner_id, "u1");
    assert_eq!(call.bearer.as_deref(), Some("tok-1"));
    assert!(call.payload.is_shiny);
    assert_eq!(call.payload.nickname.as_deref(), Some("Sparky"));
    assert_eq!(call.payload.experience, 0);
    assert!((1..=20).contains(&call.payload.level));
    drop(calls);

    // The nickname stuck to the encounter as well.
    let record = h
        .engine
        .store()
        .find_by_id("u1", view.encounter_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.encounter.nickname.as_deref(), Some("Sparky"));
}

#[tokio::test]
async fn commit_requires_a_captured_encounter() {
    let h = harness(45);
    let who = owner("u1");
    let view = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();

    let err = h
        .engine
        .commit_to_collection(&who, view.encounter_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoCapturedEncounter));
    assert_eq!(err.to_string(), "No caught Pokemon found for this encounter");
}

#[tokio::test]
async fn failed_commit_leaves_captured_state_retryable() {
    let h = harness(45);
    let who = owner("u1");
    let view = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();
    h.engine
        .attempt_capture(&who, view.encounter_id, 100)
        .await
        .unwrap();

    h.collection.fail.store(true, Ordering::SeqCst);
    let err = h
        .engine
        .commit_to_collection(&who, view.encounter_id, None)
        .await
        .unwrap_err();
    match err {
        EngineError::Dependency(dep) => assert_eq!(dep.status, Some(500)),
        other => panic!("expected dependency error, got {other}"),
    }

    let record = h
        .engine
        .store()
        .find_by_id("u1", view.encounter_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.encounter.status, EncounterStatus::Captured);

    // Collaborator recovers; the same commit goes through.
    h.collection.fail.store(false, Ordering::SeqCst);
    let outcome = h
        .engine
        .commit_to_collection(&who, view.encounter_id, None)
        .await
        .unwrap();
    assert_eq!(outcome.message, "eevee was added to your collection!");
}

#[tokio::test]
async fn species_failure_aborts_spawn_without_a_record() {
    let rng = TestRandom::new(0.9);
    let engine = EncounterEngine::new(
        MemoryStore::new(),
        Arc::new(FailingSpecies),
        StubCollection::new(),
        rng,
    );
    let who = owner("u1");

    let err = engine.spawn(&who, SpawnRequest::default()).await.unwrap_err();
    match err {
        EngineError::Dependency(dep) => assert_eq!(dep.status, Some(503)),
        other => panic!("expected dependency error, got {other}"),
    }
    assert!(engine.store().find_active("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn get_active_tracks_remaining_attempts() {
    let h = harness(0);
    let who = owner("u1");
    let view = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();

    h.engine
        .attempt_capture(&who, view.encounter_id, 0)
        .await
        .unwrap();
    let active = h.engine.get_active(&who).await.unwrap();
    assert_eq!(active.encounter_id, view.encounter_id);
    assert_eq!(active.attempts_remaining, 2);
    assert_eq!(active.pokemon.capture_rate, Some(0));
}

#[tokio::test]
async fn get_active_without_encounter_is_an_error() {
    let h = harness(45);
    let err = h.engine.get_active(&owner("u1")).await.unwrap_err();
    assert!(matches!(err, EngineError::NoActiveEncounter));
}

#[tokio::test]
async fn spawn_honors_an_explicit_species_id() {
    let h = harness(45);
    let view = h
        .engine
        .spawn(&owner("u1"), SpawnRequest {
            species_id: Some(133),
            max_species_id: None,
        })
        .await
        .unwrap();
    assert_eq!(view.pokemon.id, 133);
}

#[tokio::test]
async fn history_is_newest_first_with_default_limit() {
    let h = harness(45);
    let who = owner("u1");

    let mut ids = Vec::new();
    for _ in 0..25 {
        let view = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();
        h.engine.abandon(&who, view.encounter_id).await.unwrap();
        ids.push(view.encounter_id);
    }

    let history = h.engine.history(&who, None).await.unwrap();
    assert_eq!(history.len(), 20);
    assert_eq!(history[0].id, *ids.last().unwrap());
    assert_eq!(history[0].status, EncounterStatus::Abandoned);
    assert_eq!(history[0].attempts_used, 0);

    let short = h.engine.history(&who, Some(5)).await.unwrap();
    assert_eq!(short.len(), 5);
}

#[tokio::test]
async fn other_owners_cannot_touch_an_encounter() {
    let h = harness(45);
    let who = owner("u1");
    let intruder = owner("u2");
    let view = h.engine.spawn(&who, SpawnRequest::default()).await.unwrap();

    let err = h
        .engine
        .attempt_capture(&intruder, view.encounter_id, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoActiveEncounter));

    let err = h.engine.abandon(&intruder, view.encounter_id).await.unwrap_err();
    assert!(matches!(err, EngineError::NoActiveEncounter));

    // Untouched for the real owner.
    let record = h
        .engine
        .store()
        .find_by_id("u1", view.encounter_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.encounter.status, EncounterStatus::Active);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_spawns_admit_exactly_one() {
    let h = harness(45);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = h.engine.clone();
        handles.push(tokio::spawn(async move {
            engine.spawn(&Identity::new("u1"), SpawnRequest::default()).await
        }));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(EngineError::AlreadyActive) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(conflicts, 9);
}
