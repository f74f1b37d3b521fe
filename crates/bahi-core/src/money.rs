//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A tax split done in floats:                                            │
//! │    ₹0.09 / 2 = ₹0.045 per component → ₹0.04 + ₹0.04 = ₹0.08  (lost 1p)  │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    9 paise split → 4 + 5 paise, the odd paisa is assigned explicitly    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bahi_core::money::Money;
//!
//! let price = Money::from_minor(10_050); // ₹100.50
//! let doubled = price.multiply_quantity(2); // Some(₹201.00)
//! let total = price + Money::from_minor(50); // ₹101.00
//! assert_eq!(doubled.map(|m| m.minor()), Some(20_100));
//! assert_eq!(total.minor(), 10_100);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

/// Minor units per major unit (paise per rupee).
pub const MINOR_PER_MAJOR: i64 = 100;

/// Basis points in one whole (100.00 %).
pub const BPS_SCALE: i64 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paise).
///
/// ## Design Decisions
/// - **i64 (signed)**: stock reversals and negative balances are legal
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized as a bare integer**: the UI formats for display
/// - **Checked aggregation**: quantities, basis points and sums go through
///   the `checked_*` methods; the plain operators are for values already
///   bounded by `MAX_AMOUNT`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units (paise).
    ///
    /// ## Example
    /// ```rust
    /// use bahi_core::money::Money;
    ///
    /// let price = Money::from_minor(1099); // ₹10.99
    /// assert_eq!(price.minor(), 1099);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * MINOR_PER_MAJOR)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % MINOR_PER_MAJOR).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity. `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use bahi_core::money::Money;
    ///
    /// let unit_price = Money::from_minor(10_000);
    /// assert_eq!(unit_price.multiply_quantity(2), Some(Money::from_minor(20_000)));
    /// assert_eq!(Money::from_minor(i64::MAX).multiply_quantity(2), None);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(minor) => Some(Money(minor)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(minor) => Some(Money(minor)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_sub(&self, other: Money) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(minor) => Some(Money(minor)),
            None => None,
        }
    }

    /// Sums amounts, `None` as soon as the running total overflows.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |total, amount| total.checked_add(amount))
    }

    /// Applies a basis-point fraction, rounding half away from zero.
    ///
    /// `None` when the result does not fit in i64 (only possible above
    /// 100 %).
    ///
    /// ## Implementation
    /// Integer math on i128: `(amount * bps ± 5000) / 10000`.
    ///
    /// ## Example
    /// ```rust
    /// use bahi_core::money::Money;
    ///
    /// // ₹10.00 at 8.25% = 82.5 paise → 83 paise
    /// assert_eq!(Money::from_minor(1000).apply_bps(825), Some(Money::from_minor(83)));
    /// ```
    pub fn apply_bps(&self, bps: u32) -> Option<Money> {
        let scaled = round_div(self.0 as i128 * bps as i128, BPS_SCALE as i128);
        i64::try_from(scaled).ok().map(Money)
    }

    /// Calculates tax at the given rate, rounded half-up to the paisa.
    ///
    /// ## User Workflow
    /// ```text
    /// Taxable value: ₹200.00
    ///      │
    ///      ▼
    /// calculate_tax(18%) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line tax: ₹36.00 → handed to the regional split
    /// ```
    #[inline]
    pub fn calculate_tax(&self, rate: TaxRate) -> Option<Money> {
        self.apply_bps(rate.bps())
    }

    /// Expresses `self` as basis points of `whole`, rounded half-up.
    ///
    /// Returns 0 when `whole` is zero.
    ///
    /// ## Example
    /// ```rust
    /// use bahi_core::money::Money;
    ///
    /// let discount = Money::from_minor(1_000);
    /// let gross = Money::from_minor(3_000);
    /// assert_eq!(discount.bps_of(gross), 3333); // 33.33 %
    /// ```
    pub fn bps_of(&self, whole: Money) -> u32 {
        if whole.is_zero() {
            return 0;
        }
        let bps = round_div(self.0 as i128 * BPS_SCALE as i128, whole.0 as i128);
        bps.clamp(0, u32::MAX as i128) as u32
    }

    /// Splits into two halves whose sum is exactly `self`.
    ///
    /// The first half is floored; the odd paisa goes to the second.
    ///
    /// ## Example
    /// ```rust
    /// use bahi_core::money::Money;
    ///
    /// let (a, b) = Money::from_minor(9).split_half();
    /// assert_eq!((a.minor(), b.minor()), (4, 5));
    /// ```
    pub fn split_half(&self) -> (Money, Money) {
        let first = Money(self.0.div_euclid(2));
        (first, *self - first)
    }

    /// Rounds to the nearest whole rupee (half away from zero).
    ///
    /// Presentation only; aggregates are stored unrounded.
    pub fn round_to_whole_units(&self) -> Money {
        Money(round_div(self.0 as i128, MINOR_PER_MAJOR as i128) as i64 * MINOR_PER_MAJOR)
    }
}

/// Integer division rounding half away from zero.
fn round_div(numerator: i128, denominator: i128) -> i128 {
    let half = denominator.abs() / 2;
    let magnitude = (numerator.abs() + half) / denominator.abs();
    if (numerator < 0) != (denominator < 0) {
        -magnitude
    } else {
        magnitude
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money as rupees, for logs and debugging.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.major().abs(), self.minor_part())
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
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
        let money = Money::from_minor(1099);
        assert_eq!(money.minor(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
        assert_eq!(Money::from_major(5).minor(), 500);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(1099).to_string(), "₹10.99");
        assert_eq!(Money::from_minor(500).to_string(), "₹5.00");
        assert_eq!(Money::from_minor(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!(a.multiply_quantity(3), Some(Money::from_minor(3000)));
        assert_eq!((-a).minor(), -1000);

        assert_eq!(Money::checked_sum([a, b, b]), Some(Money::from_minor(2000)));
        assert_eq!(Money::checked_sum([]), Some(Money::zero()));
    }

    #[test]
    fn test_checked_arithmetic_overflow() {
        let big = Money::from_minor(i64::MAX / 2 + 10);

        assert_eq!(Money::from_minor(10_i64.pow(18)).multiply_quantity(100_000), None);
        assert_eq!(big.checked_add(big), None);
        assert_eq!(Money::from_minor(i64::MIN).checked_sub(Money::from_minor(1)), None);
        assert_eq!(Money::checked_sum([big, big]), None);
        assert_eq!(Money::from_minor(i64::MAX).apply_bps(20_000), None);
        assert_eq!(Money::from_minor(i64::MAX).apply_bps(10_000), Some(Money::from_minor(i64::MAX)));
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // ₹10.00 at 8.25% = 82.5 paise → 83
        assert_eq!(Money::from_minor(1000).calculate_tax(TaxRate::from_bps(825)), Some(Money::from_minor(83)));
        // ₹200.00 at 18% = ₹36.00
        assert_eq!(Money::from_minor(20_000).calculate_tax(TaxRate::from_bps(1800)), Some(Money::from_minor(3600)));
        // 0.5 paisa below zero rounds away from zero
        assert_eq!(Money::from_minor(-1000).apply_bps(825), Some(Money::from_minor(-83)));
    }

    #[test]
    fn test_bps_of() {
        assert_eq!(Money::from_minor(1000).bps_of(Money::from_minor(10_000)), 1000);
        assert_eq!(Money::from_minor(1000).bps_of(Money::from_minor(3000)), 3333);
        assert_eq!(Money::from_minor(2000).bps_of(Money::from_minor(3000)), 6667);
        assert_eq!(Money::from_minor(50).bps_of(Money::zero()), 0);
    }

    #[test]
    fn test_split_half_preserves_total() {
        for minor in [0, 1, 9, 3600, 3601, -7] {
            let total = Money::from_minor(minor);
            let (a, b) = total.split_half();
            assert_eq!(a + b, total);
            assert!((b - a).minor() == 0 || (b - a).minor() == 1);
        }
    }

    #[test]
    fn test_round_to_whole_units() {
        assert_eq!(Money::from_minor(23_649).round_to_whole_units().minor(), 23_600);
        assert_eq!(Money::from_minor(23_650).round_to_whole_units().minor(), 23_700);
        assert_eq!(Money::from_minor(-150).round_to_whole_units().minor(), -200);
    }
}
