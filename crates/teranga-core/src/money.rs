//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FRANC CFA HAS NO SUBUNIT                                           │
//! │                                                                         │
//! │  Every amount the engine stores is a whole number of francs (XOF).     │
//! │  Intermediate results (quantity × price × discount, HT × rate) can     │
//! │  be fractional, so each one is rounded exactly once:                   │
//! │                                                                         │
//! │    round-half-up to the nearest unit  (2.5 → 3, 2.49 → 2)              │
//! │                                                                         │
//! │  Products are computed in i128 before dividing, so no precision is     │
//! │  lost and no float ever touches an amount.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use teranga_core::money::Money;
//! use teranga_core::types::TaxRate;
//!
//! let ht = Money::from_minor(10_000);
//! let tva = ht.calculate_tax(TaxRate::STANDARD);
//! assert_eq!(tva.minor(), 1_800);
//! assert_eq!((ht + tva).minor(), 11_800);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::{Percentage, TaxRate};

/// Basis points in 100 %.
pub const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Rounding
// =============================================================================

/// Divides `numerator` by a positive `denominator`, rounding half away from zero.
///
/// For the non-negative values the calculator produces this is plain
/// round-half-up.
///
/// ```rust
/// use teranga_core::money::round_div;
///
/// assert_eq!(round_div(25, 10), 3);
/// assert_eq!(round_div(24, 10), 2);
/// assert_eq!(round_div(-25, 10), -3);
/// ```
pub fn round_div(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0, "denominator must be positive");
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        -((-numerator + half) / denominator)
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in francs CFA (XOF), the smallest unit in use.
///
/// ## Where Money is Used
/// ```text
/// DocumentLine.unit_price ──► LineAmounts { ht, tax, ttc }
///                                   │
///                                   ▼
///                         DocumentTotals { ht, tax, ttc }
///                                   │
///               ┌───────────────────┼───────────────────┐
///               ▼                   ▼                   ▼
///        JournalLine.debit   Payment.amount    StockRecord.weighted_average_cost
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole francs.
    ///
    /// ```rust
    /// use teranga_core::money::Money;
    ///
    /// let price = Money::from_minor(2_500);
    /// assert_eq!(price.minor(), 2_500);
    /// ```
    #[inline]
    pub const fn from_minor(amount: i64) -> Self {
        Money(amount)
    }

    /// Returns the value in whole francs.
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
        Money(self.0.abs())
    }

    /// Calculates TVA on this (already rounded) HT amount.
    ///
    /// ## Implementation
    /// `round(amount × bps / 10000)`, half-up, computed in i128.
    ///
    /// ```rust
    /// use teranga_core::money::Money;
    /// use teranga_core::types::TaxRate;
    ///
    /// // 18 % of 1 003 = 180.54 → 181
    /// let tax = Money::from_minor(1_003).calculate_tax(TaxRate::STANDARD);
    /// assert_eq!(tax.minor(), 181);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax = round_div(self.0 as i128 * rate.bps() as i128, BPS_SCALE);
        Money::from_minor(tax as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `round(self × (1 - discount))`.
    ///
    /// The discounted amount is rounded as a whole rather than rounding the
    /// discount and subtracting it, so `x.5` always goes up.
    ///
    /// ```rust
    /// use teranga_core::money::Money;
    /// use teranga_core::types::Percentage;
    ///
    /// let gross = Money::from_minor(10_000);
    /// let net = gross.apply_discount(Percentage::from_percent(10));
    /// assert_eq!(net.minor(), 9_000);
    /// ```
    pub fn apply_discount(&self, discount: Percentage) -> Money {
        let remaining_bps = BPS_SCALE - discount.bps() as i128;
        Money::from_minor(round_div(self.0 as i128 * remaining_bps, BPS_SCALE) as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount the way invoices print it: `11 800 FCFA`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(' ');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{} FCFA", sign, grouped)
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
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
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
    fn test_round_div_half_up() {
        assert_eq!(round_div(15, 10), 2);
        assert_eq!(round_div(14, 10), 1);
        assert_eq!(round_div(0, 10), 0);
        assert_eq!(round_div(-15, 10), -2);
        assert_eq!(round_div(3000, 20), 150);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(11_800).to_string(), "11 800 FCFA");
        assert_eq!(Money::from_minor(500).to_string(), "500 FCFA");
        assert_eq!(Money::from_minor(1_234_567).to_string(), "1 234 567 FCFA");
        assert_eq!(Money::from_minor(-2_000).to_string(), "-2 000 FCFA");
        assert_eq!(Money::zero().to_string(), "0 FCFA");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((a * 3).minor(), 3000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.minor(), 2000);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 18 % of 25 = 4.5 → 5
        assert_eq!(Money::from_minor(25).calculate_tax(TaxRate::STANDARD).minor(), 5);
        // 18 % of 10 000 = 1 800 exactly
        assert_eq!(
            Money::from_minor(10_000).calculate_tax(TaxRate::STANDARD).minor(),
            1_800
        );
        assert!(Money::from_minor(10_000)
            .calculate_tax(TaxRate::EXEMPT)
            .is_zero());
    }

    #[test]
    fn test_discount_rounds_whole_amount() {
        // 2.5 % off 1 001 = 975.975 → 976
        let net = Money::from_minor(1_001).apply_discount(Percentage::from_bps(250));
        assert_eq!(net.minor(), 976);

        let full = Money::from_minor(1_001).apply_discount(Percentage::from_percent(100));
        assert!(full.is_zero());

        let none = Money::from_minor(1_001).apply_discount(Percentage::zero());
        assert_eq!(none.minor(), 1_001);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_minor(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().minor(), 100);
    }
}
