//! # Unit Types
//!
//! Type-safe wrappers for the handful of units a roof report deals in. They
//! are plain f64 newtypes so JSON stays clean (just numbers).
//!
//! ## Conversion Constants
//!
//! The conversion factors are the literal values used by existing report
//! consumers and must not be recomputed from one another:
//! - 1 m = 3.28084 ft
//! - 1 m² = 10.7639 ft² (not `3.28084²`)
//! - 1 roofing square = 100 ft²
//!
//! ## Example
//!
//! ```rust
//! use roof_core::units::{Feet, Meters, SqFt, SqMeters};
//!
//! let edge: Feet = Meters(10.0).into();
//! assert!((edge.0 - 32.8084).abs() < 1e-9);
//!
//! let area: SqFt = SqMeters(100.0).into();
//! assert!((area.0 - 1076.39).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// Feet per meter (linear)
pub const FEET_PER_METER: f64 = 3.28084;

/// Square feet per square meter
pub const SQ_FT_PER_SQ_METER: f64 = 10.7639;

/// Square feet covered by one roofing square
pub const SQ_FT_PER_SQUARE: f64 = 100.0;

// ============================================================================
// Length Units
// ============================================================================

/// Length in meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meters(pub f64);

/// Length in feet
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feet(pub f64);

impl From<Meters> for Feet {
    fn from(m: Meters) -> Self {
        Feet(m.0 * FEET_PER_METER)
    }
}

impl From<Feet> for Meters {
    fn from(ft: Feet) -> Self {
        Meters(ft.0 / FEET_PER_METER)
    }
}

// ============================================================================
// Area Units
// ============================================================================

/// Area in square meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SqMeters(pub f64);

/// Area in square feet
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SqFt(pub f64);

impl From<SqMeters> for SqFt {
    fn from(sqm: SqMeters) -> Self {
        SqFt(sqm.0 * SQ_FT_PER_SQ_METER)
    }
}

impl From<SqFt> for SqMeters {
    fn from(sqft: SqFt) -> Self {
        SqMeters(sqft.0 / SQ_FT_PER_SQ_METER)
    }
}

impl SqFt {
    /// Number of 100 ft² roofing squares covered by this area (unrounded)
    pub fn squares(self) -> f64 {
        self.0 / SQ_FT_PER_SQUARE
    }
}

// ============================================================================
// Arithmetic Implementations (macro to reduce boilerplate)
// ============================================================================

macro_rules! impl_arithmetic {
    ($type:ty) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl $type {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }

            /// Create from raw f64 value
            pub fn new(value: f64) -> Self {
                Self(value)
            }

            /// Round to the nearest whole unit
            pub fn rounded(self) -> Self {
                Self(round_to(self.0, 0))
            }
        }
    };
}

impl_arithmetic!(Meters);
impl_arithmetic!(Feet);
impl_arithmetic!(SqMeters);
impl_arithmetic!(SqFt);

// ============================================================================
// Rounding
// ============================================================================

/// Round to `decimals` places, halves away from zero.
///
/// ```rust
/// use roof_core::units::round_to;
///
/// assert_eq!(round_to(2.5, 0), 3.0);
/// assert_eq!(round_to(-2.5, 0), -3.0);
/// assert_eq!(round_to(35.004, 2), 35.0);
/// ```
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if decimals == 0 {
        return value.round();
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meters_to_feet() {
        let ft: Feet = Meters(1.0).into();
        assert_eq!(ft.0, 3.28084);
    }

    #[test]
    fn test_area_factor_is_literal() {
        let sqft: SqFt = SqMeters(1.0).into();
        assert_eq!(sqft.0, 10.7639);
        // the squared linear factor is 10.76391..., deliberately not used
        assert_ne!(sqft.0, FEET_PER_METER * FEET_PER_METER);
    }

    #[test]
    fn test_squares() {
        assert_eq!(SqFt(3500.0).squares(), 35.0);
    }

    #[test]
    fn test_arithmetic() {
        let a = Feet(10.0);
        let b = Feet(5.0);
        assert_eq!((a + b).0, 15.0);
        assert_eq!((a - b).0, 5.0);
        assert_eq!((a * 2.0).0, 20.0);
        assert_eq!((a / 2.0).0, 5.0);
        assert_eq!(Feet(10.5).rounded().0, 11.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.5, 0), 1.0);
        assert_eq!(round_to(1234.4999, 0), 1234.0);
        assert_eq!(round_to(12.345678, 2), 12.35);
    }

    #[test]
    fn test_serialization() {
        let area = SqFt(3500.0);
        let json = serde_json::to_string(&area).unwrap();
        assert_eq!(json, "3500.0");

        let roundtrip: SqFt = serde_json::from_str(&json).unwrap();
        assert_eq!(area, roundtrip);
    }
}
