//! # Money Module
//!
//! Provides the `Money` type used for packaging prices, delivery fees and
//! every order total.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Prices arrive from the prescription loader as JSON numbers or strings │
//! │  ("12.50", 12.5). They are converted ONCE, at the input boundary, into │
//! │  integer minor units. Everything after that is integer arithmetic:     │
//! │                                                                         │
//! │    box price 1250 × 2 boxes  = 2500                                    │
//! │    + delivery fee 200        = 2700                                    │
//! │                                                                         │
//! │  No float ever reaches a total.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use medsel_core::money::Money;
//!
//! let box_price = Money::from_cents(1250);
//! let line = box_price * 2_i64;
//! assert_eq!((line + Money::from_cents(200)).cents(), 2700);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

use crate::parse;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Serializes as a bare integer so the front end receives minor units and
/// formats them itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use medsel_core::money::Money;
    ///
    /// let fee = Money::from_cents(2000);
    /// assert_eq!(fee.cents(), 2000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Creates a Money value from whole major units, saturating at the
    /// `i64` bounds.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major.saturating_mul(100))
    }

    /// Parses a decimal price string, falling back to zero.
    ///
    /// ## Example
    /// ```rust
    /// use medsel_core::money::Money;
    ///
    /// assert_eq!(Money::parse_lenient("12.5").cents(), 1250);
    /// assert_eq!(Money::parse_lenient("n/a"), Money::zero());
    /// ```
    pub fn parse_lenient(raw: &str) -> Self {
        parse::decimal_to_cents(raw)
            .map(Money::from_cents)
            .unwrap_or_default()
    }

    /// Converts a loosely-typed JSON price (number or numeric string).
    ///
    /// Anything else (null, bool, object, NaN) becomes zero.
    pub fn from_json_lenient(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(whole) = n.as_i64() {
                    Money::from_major(whole)
                } else {
                    n.as_f64()
                        .filter(|f| f.is_finite())
                        .map(|f| Money::from_cents((f * 100.0).round() as i64))
                        .unwrap_or_default()
                }
            }
            serde_json::Value::String(s) => Money::parse_lenient(s),
            _ => Money::zero(),
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Multiplies by a packaging quantity, saturating at the `i64` bounds.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering. The session layer formats with the configured
/// currency symbol for anything user-facing.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
        assert_eq!(Money::from_major(100).cents(), 10000);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);
        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);
        assert_eq!((b * 3_i64).cents(), 750);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 1500);
    }

    #[test]
    fn test_lenient_json_prices() {
        assert_eq!(Money::from_json_lenient(&json!(100)).cents(), 10000);
        assert_eq!(Money::from_json_lenient(&json!(12.5)).cents(), 1250);
        assert_eq!(Money::from_json_lenient(&json!("7.25")).cents(), 725);
        assert_eq!(Money::from_json_lenient(&json!("free")), Money::zero());
        assert_eq!(Money::from_json_lenient(&json!(null)), Money::zero());
    }

    #[test]
    fn test_arithmetic_saturates_instead_of_overflowing() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(Money::from_major(i64::MAX / 10), max);
        assert_eq!(Money::from_major(i64::MIN / 10), Money::from_cents(i64::MIN));
        assert_eq!(Money::from_cents(2) * (i64::MAX / 10), max);
        assert_eq!(Money::from_cents(500).multiply_quantity(i64::MAX), max);
        assert_eq!(max + Money::from_cents(1), max);

        let mut total = max;
        total += Money::from_cents(200);
        assert_eq!(total, max);

        let summed: Money = vec![max, max, Money::from_cents(1)].into_iter().sum();
        assert_eq!(summed, max);
    }

    #[test]
    fn test_huge_json_prices_saturate() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(Money::from_json_lenient(&json!(100_000_000_000_000_000_i64)), max);
        assert_eq!(Money::from_json_lenient(&json!(1e300)), max);
        assert_eq!(Money::from_json_lenient(&json!("92233720368547758.99")), Money::zero());
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&Money::from_cents(2000)).unwrap();
        assert_eq!(json, "2000");
    }
}
