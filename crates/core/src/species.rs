//! Species data as the encounter service sees it.

use serde::{Deserialize, Serialize};

/// Denormalized species data stored on an encounter at spawn time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesSnapshot {
    pub species_id: u32,
    pub name: String,
    pub sprite: Option<String>,
    /// Rare cosmetic variant, decided once at spawn and never re-rolled.
    pub is_rare: bool,
    /// Base capture rate on the 0-255 scale.
    pub capture_rate: u8,
}

/// Sprite variants as returned by the species provider.
///
/// `alt` is the secondary standard sprite (the provider exposes both a
/// plain front sprite and an artwork/front_default fallback).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpriteSet {
    pub front: Option<String>,
    pub front_shiny: Option<String>,
    pub alt: Option<String>,
}

impl SpriteSet {
    /// Pick the sprite for an encounter: the rare variant when the
    /// encounter is rare and the variant exists, otherwise the standard
    /// front sprite, otherwise the alternate.
    pub fn pick(&self, is_rare: bool) -> Option<String> {
        if is_rare {
            if let Some(shiny) = &self.front_shiny {
                return Some(shiny.clone());
            }
        }
        self.front.clone().or_else(|| self.alt.clone())
    }
}
