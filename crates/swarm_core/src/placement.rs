//! Seeded random debris placement.
//!
//! All randomness in the crate goes through a `ChaCha8Rng` seeded from
//! [`FieldConfig::seed`], and coordinates are drawn as whole hundredths
//! of a plane unit. The same seed always produces the same field on
//! every platform.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::components::{Debris, Material};
use crate::error::{Result, SwarmError};
use crate::math::{Fixed, Vec2Fixed, MAX_PLANE_DISTANCE};

/// Attempts per piece before accepting a spot closer to home than requested.
const MAX_PLACEMENT_ATTEMPTS: u32 = 32;

/// Upper limit on generated field size.
pub const MAX_FIELD_SIZE: u32 = 10_000;

/// Settings for a randomly generated debris field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Random seed for deterministic generation.
    pub seed: u64,
    /// Number of debris pieces.
    pub count: u32,
    /// Keep-out band along every edge of the plane.
    pub margin: f64,
    /// Preferred minimum distance from the mother station.
    pub min_home_distance: f64,
    /// Prefix for generated debris IDs.
    pub id_prefix: String,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            count: 12,
            margin: 5.0,
            min_home_distance: 10.0,
            id_prefix: "field".to_string(),
        }
    }
}

impl FieldConfig {
    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of pieces.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// Generate a debris field around `home`.
pub fn generate_debris_field(config: &FieldConfig, home: Vec2Fixed) -> Result<Vec<Debris>> {
    if config.count > MAX_FIELD_SIZE {
        return Err(SwarmError::InvalidConfig(format!(
            "field count {} exceeds the limit of {MAX_FIELD_SIZE}",
            config.count
        )));
    }
    if !(0.0..50.0).contains(&config.margin) {
        return Err(SwarmError::InvalidConfig(format!(
            "field margin must be within 0..50, got {}",
            config.margin
        )));
    }
    let min_distance = Fixed::checked_from_num(config.min_home_distance)
        .filter(|d| (Fixed::ZERO..=MAX_PLANE_DISTANCE).contains(d))
        .ok_or_else(|| {
            SwarmError::InvalidConfig(format!(
                "min_home_distance must be within 0..={MAX_PLANE_DISTANCE}, got {}",
                config.min_home_distance
            ))
        })?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    #[allow(clippy::cast_possible_truncation)]
    let low = (config.margin * 100.0).ceil() as i32;
    let high = 10_000 - low;
    let min_distance_sq = min_distance * min_distance;

    let mut field = Vec::with_capacity(config.count as usize);
    for index in 0..config.count {
        let mut position = random_point(&mut rng, low, high);
        for _ in 1..MAX_PLACEMENT_ATTEMPTS {
            if position.distance_squared(home) >= min_distance_sq {
                break;
            }
            position = random_point(&mut rng, low, high);
        }

        let material = *Material::ALL
            .choose(&mut rng)
            .unwrap_or(&Material::Aluminum);
        let size = hundredths(rng.gen_range(100..=500));

        field.push(Debris::new(
            format!("{}-{:03}", config.id_prefix, index + 1),
            position,
            material,
            size,
        ));
    }

    tracing::debug!(
        seed = config.seed,
        count = field.len(),
        "Generated debris field"
    );
    Ok(field)
}

fn random_point(rng: &mut ChaCha8Rng, low: i32, high: i32) -> Vec2Fixed {
    let x = rng.gen_range(low..=high);
    let y = rng.gen_range(low..=high);
    Vec2Fixed::new(hundredths(x), hundredths(y))
}

fn hundredths(value: i32) -> Fixed {
    Fixed::from_num(value) / Fixed::from_num(100)
}
