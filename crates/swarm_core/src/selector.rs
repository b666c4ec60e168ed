//! Nearest-target selection.
//!
//! A plain linear scan. Distances are compared squared, so no square
//! roots are taken. Ties go to the earliest piece in registry order.

use crate::components::Debris;
use crate::math::Vec2Fixed;

/// Index of the nearest unclaimed debris piece, if any remain.
#[must_use]
pub fn nearest_available_index(position: Vec2Fixed, debris: &[Debris]) -> Option<usize> {
    debris
        .iter()
        .enumerate()
        .filter(|(_, piece)| piece.is_available())
        // min_by_key keeps the first of equal minima
        .min_by_key(|(_, piece)| position.distance_squared(piece.position).to_bits())
        .map(|(index, _)| index)
}

/// The nearest unclaimed debris piece, if any remain.
#[must_use]
pub fn nearest_available(position: Vec2Fixed, debris: &[Debris]) -> Option<&Debris> {
    nearest_available_index(position, debris).map(|index| &debris[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Material;
    use crate::math::Fixed;

    fn piece(id: &str, x: i32, y: i32) -> Debris {
        Debris::new(id, Vec2Fixed::from_int(x, y), Material::Titanium, Fixed::ONE)
    }

    #[test]
    fn test_picks_nearest() {
        let debris = vec![piece("far", 90, 90), piece("near", 12, 9), piece("mid", 40, 40)];
        let found = nearest_available(Vec2Fixed::from_int(10, 10), &debris).unwrap();
        assert_eq!(found.id.as_str(), "near");
    }

    #[test]
    fn test_skips_collected() {
        let mut debris = vec![piece("near", 11, 10), piece("far", 60, 60)];
        debris[0].collected = true;
        assert_eq!(nearest_available_index(Vec2Fixed::from_int(10, 10), &debris), Some(1));
    }

    #[test]
    fn test_none_when_everything_claimed() {
        let mut debris = vec![piece("a", 1, 1)];
        debris[0].collected = true;
        assert!(nearest_available(Vec2Fixed::ZERO, &debris).is_none());
        assert!(nearest_available(Vec2Fixed::ZERO, &[]).is_none());
    }

    #[test]
    fn test_tie_goes_to_first() {
        // Both at distance 5 from the origin
        let debris = vec![piece("first", 3, 4), piece("second", 4, 3), piece("third", 0, 5)];
        assert_eq!(nearest_available_index(Vec2Fixed::ZERO, &debris), Some(0));
    }
}
