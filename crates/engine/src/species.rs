//! Species provider adapter: read-only lookup of static species data.
//!
//! The HTTP implementation uses `ureq` (sync) wrapped in
//! `tokio::task::spawn_blocking` to avoid blocking the async runtime,
//! and consults an injected [`TtlCache`] before going to the network.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use safari_core::capture::DEFAULT_CAPTURE_RATE;
use safari_core::SpriteSet;

use crate::cache::TtlCache;
use crate::error::DependencyError;

/// Normalized species data as the engine consumes it.
#[derive(Debug, Clone)]
pub struct SpeciesRecord {
    pub id: u32,
    pub name: String,
    pub sprites: SpriteSet,
    /// 0-255 base capture rate; the provider's default applies when the
    /// upstream record omits one.
    pub capture_rate: u8,
}

/// Read-only species lookup. A transport failure aborts the caller's
/// spawn; no encounter is created on error.
#[async_trait]
pub trait SpeciesProvider: Send + Sync {
    async fn fetch(&self, species_id: u32) -> Result<SpeciesRecord, DependencyError>;
}

/// Wire shape of the pokedex collaborator's species payload. Only the
/// fields the engine snapshots are deserialized.
#[derive(Debug, Deserialize)]
struct WireSpecies {
    id: u32,
    name: String,
    #[serde(default)]
    sprites: WireSprites,
    #[serde(rename = "captureRate")]
    capture_rate: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct WireSprites {
    front: Option<String>,
    #[serde(rename = "frontShiny")]
    front_shiny: Option<String>,
    #[serde(rename = "front_default")]
    front_default: Option<String>,
    artwork: Option<String>,
}

impl From<WireSpecies> for SpeciesRecord {
    fn from(wire: WireSpecies) -> Self {
        let capture_rate = wire
            .capture_rate
            .map(|r| r.min(255) as u8)
            .unwrap_or(DEFAULT_CAPTURE_RATE);
        SpeciesRecord {
            id: wire.id,
            name: wire.name,
            sprites: SpriteSet {
                front: wire.sprites.front,
                front_shiny: wire.sprites.front_shiny,
                alt: wire.sprites.front_default.or(wire.sprites.artwork),
            },
            capture_rate,
        }
    }
}

/// Adapter that fetches species records over HTTP, keyed-cached with a
/// TTL so repeated spawns of the same species stay off the network.
pub struct HttpSpeciesProvider {
    base_url: String,
    cache: Arc<TtlCache<SpeciesRecord>>,
}

impl HttpSpeciesProvider {
    pub fn new(base_url: impl Into<String>, cache: Arc<TtlCache<SpeciesRecord>>) -> Self {
        Self {
            base_url: base_url.into(),
            cache,
        }
    }

    fn url_for(&self, species_id: u32) -> String {
        format!("{}/pokedex/{}", self.base_url.trim_end_matches('/'), species_id)
    }
}

#[async_trait]
impl SpeciesProvider for HttpSpeciesProvider {
    async fn fetch(&self, species_id: u32) -> Result<SpeciesRecord, DependencyError> {
        let cache_key = format!("species-{species_id}");
        if let Some(hit) = self.cache.get(&cache_key).await {
            return Ok(hit);
        }

        let url = self.url_for(species_id);
        let record = tokio::task::spawn_blocking(move || fetch_blocking(&url))
            .await
            .map_err(|e| DependencyError::new(format!("task join error: {e}")))??;

        self.cache.put(&cache_key, record.clone()).await;
        Ok(record)
    }
}

fn fetch_blocking(url: &str) -> Result<SpeciesRecord, DependencyError> {
    let agent = ureq::Agent::new_with_defaults();
    let response = agent.get(url).call().map_err(|e| match e {
        ureq::Error::StatusCode(code) => {
            DependencyError::with_status(code, format!("species lookup returned {code}"))
        }
        other => DependencyError::new(format!("species lookup failed: {other}")),
    })?;

    let wire: WireSpecies = response
        .into_body()
        .read_json()
        .map_err(|e| DependencyError::new(format!("species payload not parseable: {e}")))?;
    Ok(wire.into())
}
