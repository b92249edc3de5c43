//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Summing a month of sales as f64:                                       │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │    profit drifts by a few units per thousand rows                       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (đồng)                               │
//! │    Raw JSON numbers are rounded ONCE at the normalization boundary,     │
//! │    every sum after that is exact i64 arithmetic.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use repairdesk_core::money::Money;
//!
//! let unit_cost = Money::from_minor(100_000);
//! let line_cost = unit_cost.multiply_quantity(10);
//! assert_eq!(line_cost.minor(), 1_000_000);
//! assert_eq!(line_cost.to_string(), "1.000.000 ₫");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: profit and net figures can go negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Single currency**: there is no currency tag on purpose
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  SaleRecord.total ─────────┐                                            │
/// │  WorkOrder.total_paid ─────┼──► revenue ──┐                             │
/// │  CashTxn.amount (income) ──┘              ├──► gross / net profit       │
/// │  LineItem cost × qty ──────────► COGS ────┘                             │
/// │  InventoryTxn.total_price ─────► stock valuation                        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_minor(amount: i64) -> Self {
        Money(amount)
    }

    /// Converts a raw JSON number into Money, rounding half away from zero.
    ///
    /// Upstream stores sometimes hand over `150000.0` or `99999.5`; this is
    /// the only place a float is allowed to become Money. Non-finite input
    /// yields zero; values beyond the i64 range clamp to `±i64::MAX`.
    ///
    /// ```rust
    /// use repairdesk_core::money::Money;
    ///
    /// assert_eq!(Money::from_raw_amount(99_999.5).minor(), 100_000);
    /// assert_eq!(Money::from_raw_amount(f64::NAN), Money::zero());
    /// assert_eq!(Money::from_raw_amount(-1e30).minor(), -i64::MAX);
    /// ```
    pub fn from_raw_amount(raw: f64) -> Self {
        if !raw.is_finite() {
            return Money::zero();
        }
        Money(clamp_raw(raw))
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.saturating_abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Part: LCD iPhone 11, cost 100.000 ₫
    /// Quantity: 3
    ///      │
    ///      ▼
    /// multiply_quantity(3) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line COGS: 300.000 ₫
    /// ```
    ///
    /// Saturates instead of overflowing.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Returns `self` unless it is zero, in which case `None`.
    ///
    /// Used by fallback chains where a zero amount means "not recorded".
    #[inline]
    pub fn non_zero(self) -> Option<Money> {
        if self.is_zero() {
            None
        } else {
            Some(self)
        }
    }
}

/// Rounds a finite float to the nearest integer within `±i64::MAX`.
///
/// `i64::MIN` is excluded so that negating or taking `abs` of the result
/// can never overflow.
pub(crate) fn clamp_raw(raw: f64) -> i64 {
    (raw.round() as i64).max(-i64::MAX)
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display groups thousands with dots and appends the đồng sign.
///
/// ## Note
/// This is for logs and debugging. The presentation layer does its own
/// localized formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{} ₫", sign, grouped)
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

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor() {
        let money = Money::from_minor(500_000);
        assert_eq!(money.minor(), 500_000);
    }

    #[test]
    fn test_from_raw_amount_rounds_once() {
        assert_eq!(Money::from_raw_amount(150_000.0).minor(), 150_000);
        assert_eq!(Money::from_raw_amount(0.4).minor(), 0);
        assert_eq!(Money::from_raw_amount(-2.5).minor(), -3);
        assert_eq!(Money::from_raw_amount(f64::INFINITY).minor(), 0);
    }

    #[test]
    fn test_out_of_range_amounts_clamp() {
        assert_eq!(Money::from_raw_amount(1e30).minor(), i64::MAX);
        assert_eq!(Money::from_raw_amount(-1e30).minor(), -i64::MAX);
        assert_eq!(Money::from_raw_amount(-1e30).abs().minor(), i64::MAX);
        assert_eq!((-Money::from_raw_amount(-1e30)).minor(), i64::MAX);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let huge = Money::from_minor(i64::MAX / 2);
        assert_eq!(huge.multiply_quantity(3).minor(), i64::MAX);
        assert_eq!((huge * -3).minor(), i64::MIN);
        assert_eq!((huge + huge + huge).minor(), i64::MAX);
        assert_eq!((-huge - huge - huge).minor(), i64::MIN);

        let total: Money = vec![Money::from_minor(i64::MAX); 3].into_iter().sum();
        assert_eq!(total.minor(), i64::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(0).to_string(), "0 ₫");
        assert_eq!(Money::from_minor(999).to_string(), "999 ₫");
        assert_eq!(Money::from_minor(1_000).to_string(), "1.000 ₫");
        assert_eq!(Money::from_minor(1_000_000).to_string(), "1.000.000 ₫");
        assert_eq!(Money::from_minor(-400_000).to_string(), "-400.000 ₫");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((a * 3).minor(), 3000);
        assert_eq!((-a).minor(), -1000);
    }

    #[test]
    fn test_sum() {
        let amounts = vec![Money::from_minor(1), Money::from_minor(2), Money::from_minor(3)];
        let by_ref: Money = amounts.iter().sum();
        let by_value: Money = amounts.into_iter().sum();
        assert_eq!(by_ref.minor(), 6);
        assert_eq!(by_value.minor(), 6);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
        assert_eq!(zero.non_zero(), None);

        let positive = Money::from_minor(100);
        assert!(positive.is_positive());
        assert_eq!(positive.non_zero(), Some(positive));

        let negative = Money::from_minor(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().minor(), 100);
    }
}
