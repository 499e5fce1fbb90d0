//! Fixed-point math utilities for deterministic generation.
//!
//! Map generation must produce bit-identical grids for a given seed on
//! every platform, so the core never touches floating point. Fractions
//! (progress, percentages) and non-integer thresholds such as bridge
//! spacing use fixed-point arithmetic instead.

use fixed::types::I32F32;

/// Fixed-point number type for all generator math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

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

/// Number of cells that make up `percent` of `area`, rounded down.
#[must_use]
pub const fn percent_of(area: usize, percent: u32) -> usize {
    area * percent as usize / 100
}

/// `numerator / denominator` as a fixed-point fraction.
///
/// A zero denominator yields zero rather than panicking.
#[must_use]
pub fn fraction(numerator: u32, denominator: u32) -> Fixed {
    if denominator == 0 {
        return Fixed::ZERO;
    }
    Fixed::from_num(numerator) / Fixed::from_num(denominator)
}

/// Euclidean distance between two integer offsets.
#[must_use]
pub fn euclidean(dx: i32, dy: i32) -> Fixed {
    let sq = i64::from(dx) * i64::from(dx) + i64::from(dy) * i64::from(dy);
    fixed_sqrt(Fixed::from_num(sq))
}

/// Computes the square root of a fixed-point number using binary search.
fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::from_num(1) {
        value
    } else {
        Fixed::from_num(1)
    };

    for _ in 0..48 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of_rounds_down() {
        assert_eq!(percent_of(400, 25), 100);
        assert_eq!(percent_of(10, 33), 3);
        assert_eq!(percent_of(0, 50), 0);
    }

    #[test]
    fn test_fraction() {
        assert_eq!(fraction(1, 2), Fixed::from_num(0.5));
        assert_eq!(fraction(7, 0), Fixed::ZERO);
    }

    #[test]
    fn test_euclidean() {
        // 3-4-5 triangle
        let d = euclidean(3, 4);
        let epsilon = Fixed::from_num(1) / Fixed::from_num(10000);
        assert!((d - Fixed::from_num(5)).abs() < epsilon, "got {d:?}");
        assert_eq!(euclidean(0, 0), Fixed::ZERO);
    }

    #[test]
    fn test_fixed_determinism() {
        // Same operations must produce identical results
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }
}
