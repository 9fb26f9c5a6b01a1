//! Exact fantasy-point arithmetic backed by rust_decimal.
//!
//! Points are summed and scaled on every recompute, so they must not drift the
//! way binary floats do across repeated passes over the same events.

use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// Fantasy points (may be negative).
///
/// Serializes to a JSON number.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Points(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Points {
    pub fn new(value: RustDecimal) -> Self {
        Points(value)
    }

    /// Parse points from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Points)
    }

    /// Whole-number points, the common case for scoring events.
    pub fn from_i64(value: i64) -> Self {
        Points(RustDecimal::from(value))
    }

    /// Format without trailing zeros or exponent notation.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    pub fn zero() -> Self {
        Points(RustDecimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `None` when the sum leaves the decimal range.
    pub fn checked_add(self, rhs: Points) -> Option<Points> {
        self.0.checked_add(rhs.0).map(Points)
    }

    pub fn checked_mul(self, rhs: Multiplier) -> Option<Points> {
        self.0.checked_mul(rhs.0).map(Points)
    }

    /// Checked sum of a sequence; `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Points>>(iter: I) -> Option<Points> {
        iter.into_iter()
            .try_fold(Points::zero(), |acc, p| acc.checked_add(p))
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Points {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Points {
    fn from(value: RustDecimal) -> Self {
        Points(value)
    }
}

// Operators saturate at the decimal range; scoring uses the checked variants.
impl std::ops::Add for Points {
    type Output = Points;

    fn add(self, rhs: Points) -> Points {
        Points(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Points {
    type Output = Points;

    fn sub(self, rhs: Points) -> Points {
        Points(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::Mul<Multiplier> for Points {
    type Output = Points;

    fn mul(self, rhs: Multiplier) -> Points {
        Points(self.0.saturating_mul(rhs.0))
    }
}

impl Sum for Points {
    fn sum<I: Iterator<Item = Points>>(iter: I) -> Self {
        iter.fold(Points::zero(), |acc, p| acc + p)
    }
}

/// Scale applied to a single player's base score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multiplier(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Multiplier {
    /// 2.0x
    pub const CAPTAIN: Multiplier = Multiplier(RustDecimal::from_parts(20, 0, 0, false, 1));
    /// 1.5x
    pub const VICE_CAPTAIN: Multiplier = Multiplier(RustDecimal::from_parts(15, 0, 0, false, 1));
    pub const STANDARD: Multiplier = Multiplier(RustDecimal::ONE);

    pub fn inner(&self) -> RustDecimal {
        self.0
    }
}
