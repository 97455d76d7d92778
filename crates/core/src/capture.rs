//! Capture probability rules.
//!
//! A full minigame score (>= 100) is a guaranteed catch. Anything lower
//! blends the score with the species' base capture rate into a heavily
//! nerfed chance, hard-capped at 20%.

use crate::rng::RandomSource;

/// Attempts granted to every encounter at spawn.
pub const MAX_ATTEMPTS: u8 = 3;

/// Probability of the rare cosmetic variant, drawn once at spawn.
pub const RARE_CHANCE: f64 = 0.01;

/// Default upper bound for the random species roll.
pub const DEFAULT_MAX_SPECIES_ID: u32 = 151;

/// Hard ceiling for the random species roll regardless of request.
pub const SPECIES_ID_CEILING: u32 = 1010;

/// Base capture rate assumed when the provider omits one.
pub const DEFAULT_CAPTURE_RATE: u8 = 45;

/// Minigame score that guarantees a catch.
pub const GUARANTEED_SCORE: i32 = 100;

const SCORE_WEIGHT: f64 = 0.10;
const RATE_WEIGHT: f64 = 0.05;
const CHANCE_CAP: f64 = 0.20;

/// Catch probability for a sub-guaranteed score.
///
/// `score` is taken as given, without clamping to 0-100: a negative
/// score yields a non-positive chance (a draw that cannot succeed),
/// matching the upstream contract that out-of-range scores get their
/// clamped numeric effect rather than a rejection.
pub fn catch_chance(score: i32, capture_rate: u8) -> f64 {
    let score_normalized = f64::from(score) / 100.0;
    let rate_normalized = f64::from(capture_rate) / 255.0;
    let chance = score_normalized * SCORE_WEIGHT + rate_normalized * RATE_WEIGHT;
    chance.min(CHANCE_CAP)
}

/// Resolve one capture attempt: deterministic success at a full score,
/// otherwise a Bernoulli draw at [`catch_chance`].
pub fn roll_catch(score: i32, capture_rate: u8, rng: &dyn RandomSource) -> bool {
    if score >= GUARANTEED_SCORE {
        return true;
    }
    rng.unit() < catch_chance(score, capture_rate)
}

/// Clamp a requested random-roll bound to `[1, SPECIES_ID_CEILING]`.
pub fn clamp_max_species_id(max_id: u32) -> u32 {
    max_id.clamp(1, SPECIES_ID_CEILING)
}
