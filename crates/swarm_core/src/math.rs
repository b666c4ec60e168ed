//! Fixed-point math utilities for deterministic simulation.
//!
//! All swarm simulation uses fixed-point arithmetic so that two runs of
//! the same mission produce bit-identical robot positions. Floating-point
//! values only appear at the configuration boundary.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Lower bound of the normalized mission plane on both axes.
pub const PLANE_MIN: Fixed = Fixed::ZERO;

/// Upper bound of the normalized mission plane on both axes.
pub const PLANE_MAX: Fixed = Fixed::const_from_int(100);

/// Whole-unit bound on the distance between any two points on the plane.
///
/// The plane diagonal is 100·√2 ≈ 141.42. Its square still fits in
/// [`Fixed`] with plenty of room.
pub const MAX_PLANE_DISTANCE: Fixed = Fixed::const_from_int(142);

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for `Option<Vec2Fixed>`.
pub mod option_vec2_serde {
    use super::Vec2Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize an optional vector as optional raw bit pairs.
    pub fn serialize<S>(value: &Option<Vec2Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value
            .map(|v| (v.x.to_bits(), v.y.to_bits()))
            .serialize(serializer)
    }

    /// Deserialize an optional vector from optional raw bit pairs.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec2Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<(i64, i64)>::deserialize(deserializer)?;
        Ok(opt.map(|(x, y)| Vec2Fixed::from_bits(x, y)))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Create a vector from integer plane coordinates.
    #[must_use]
    pub fn from_int(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Create a vector from raw fixed-point bit patterns.
    #[must_use]
    pub const fn from_bits(x: i64, y: i64) -> Self {
        Self::new(Fixed::from_bits(x), Fixed::from_bits(y))
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Length of this vector.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Whether this point lies inside the normalized mission plane (inclusive).
    #[must_use]
    pub fn in_plane(self) -> bool {
        (PLANE_MIN..=PLANE_MAX).contains(&self.x) && (PLANE_MIN..=PLANE_MAX).contains(&self.y)
    }
}

/// Computes the square root of a fixed-point number using binary search.
///
/// Always rounds down: the result squared never exceeds `value`.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    // 64 halvings exhaust the fractional bits for any in-plane distance.
    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid == low {
            break;
        }
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::fmt::Display for Vec2Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::from_int(3, 0);
        let b = Vec2Fixed::from_int(0, 4);
        // 3² + 4² = 25
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_distance_of_pythagorean_triple_is_exact() {
        let a = Vec2Fixed::from_int(10, 10);
        let b = Vec2Fixed::from_int(16, 18);
        assert_eq!(a.distance(b), Fixed::from_num(10));
    }

    #[test]
    fn test_sqrt_rounds_down() {
        let two = Fixed::from_num(2);
        let root = fixed_sqrt(two);
        assert!(root * root <= two);
        let epsilon = Fixed::ONE / Fixed::from_num(1_000_000);
        assert!((root - Fixed::from_num(1.414_213_56)).abs() < epsilon);
    }

    #[test]
    fn test_sqrt_of_zero_and_negative() {
        assert_eq!(fixed_sqrt(Fixed::ZERO), Fixed::ZERO);
        assert_eq!(fixed_sqrt(Fixed::from_num(-4)), Fixed::ZERO);
    }

    #[test]
    fn test_in_plane_bounds_are_inclusive() {
        assert!(Vec2Fixed::from_int(0, 0).in_plane());
        assert!(Vec2Fixed::from_int(100, 100).in_plane());
        assert!(!Vec2Fixed::from_int(101, 50).in_plane());
        assert!(!Vec2Fixed::from_int(50, -1).in_plane());
    }
}
