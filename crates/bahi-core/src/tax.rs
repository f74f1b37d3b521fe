//! # Tax Engine
//!
//! Pure, stateless computation of taxable value and the regional tax split.
//!
//! ## Line Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  quantity × unit_price ──► gross                                        │
//! │                              │                                          │
//! │                  Discount (percent ⇄ amount)                            │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                          taxable ──► tax = taxable × rate (half-up)     │
//! │                                          │                              │
//! │                     ┌────────────────────┴────────────────┐             │
//! │                     ▼                                     ▼             │
//! │            SameRegion                              CrossRegion          │
//! │     component_a = ⌊tax/2⌋                    cross_region = tax         │
//! │     component_b = tax − a                    a = b = 0                  │
//! │                     │                                     │             │
//! │                     └──────────────┬──────────────────────┘             │
//! │                                    ▼                                    │
//! │                line_total = taxable + a + b + cross_region              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Order totals are plain element-wise sums of line values, so the sum of
//! line totals always equals the grand total to the paisa.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::TaxRate;
use crate::validation::{
    validate_discount_percent, validate_price, validate_quantity, validate_tax_rate_bps,
};

// =============================================================================
// Discount
// =============================================================================

/// How a caller expressed a line discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountInput {
    /// Percentage in basis points (1000 = 10 %).
    Percent(u32),
    /// Absolute amount in paise.
    Amount(Money),
}

/// A line discount carrying both its amount and its percentage.
///
/// Both views are derived together from one input, so they can never drift
/// apart. There are no setters.
///
/// Output only: it is never deserialized, only rebuilt through
/// [`Discount::resolve`] or [`Discount::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
pub struct Discount {
    amount: Money,
    percent_bps: u32,
}

impl Discount {
    /// No discount.
    pub const fn none() -> Self {
        Discount {
            amount: Money::zero(),
            percent_bps: 0,
        }
    }

    /// Builds a discount from a percentage of `gross`.
    ///
    /// ## Example
    /// ```rust
    /// use bahi_core::money::Money;
    /// use bahi_core::tax::Discount;
    ///
    /// let d = Discount::from_percent(Money::from_minor(20_000), 1000).unwrap();
    /// assert_eq!(d.amount().minor(), 2_000);
    /// ```
    pub fn from_percent(gross: Money, percent_bps: u32) -> Result<Self, ValidationError> {
        validate_discount_percent(percent_bps)?;
        let amount = gross
            .apply_bps(percent_bps)
            .ok_or_else(|| ValidationError::overflow("discount"))?;
        Ok(Discount {
            amount,
            percent_bps,
        })
    }

    /// Builds a discount from an absolute amount off `gross`.
    ///
    /// The percentage is 0 when `gross` is zero.
    pub fn from_amount(gross: Money, amount: Money) -> Result<Self, ValidationError> {
        if amount.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "discount".to_string(),
            });
        }
        if amount > gross {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: gross.minor(),
            });
        }
        Ok(Discount {
            amount,
            percent_bps: amount.bps_of(gross),
        })
    }

    /// Resolves an optional caller input against `gross`.
    pub fn resolve(gross: Money, input: Option<DiscountInput>) -> Result<Self, ValidationError> {
        match input {
            None => Ok(Discount::none()),
            Some(DiscountInput::Percent(bps)) => Discount::from_percent(gross, bps),
            Some(DiscountInput::Amount(amount)) => Discount::from_amount(gross, amount),
        }
    }

    /// Rehydrates a discount read back from storage.
    pub const fn restore(amount: Money, percent_bps: u32) -> Self {
        Discount {
            amount,
            percent_bps,
        }
    }

    #[inline]
    pub const fn amount(&self) -> Money {
        self.amount
    }

    #[inline]
    pub const fn percent_bps(&self) -> u32 {
        self.percent_bps
    }
}

// =============================================================================
// Supply Region
// =============================================================================

/// Whether a supply stays within the seller's home region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SupplyRegion {
    SameRegion,
    CrossRegion,
}

impl SupplyRegion {
    /// Compares region codes after trimming, ignoring ASCII case.
    ///
    /// ## Example
    /// ```rust
    /// use bahi_core::tax::SupplyRegion;
    ///
    /// assert_eq!(SupplyRegion::between("MH", " mh "), SupplyRegion::SameRegion);
    /// assert_eq!(SupplyRegion::between("MH", "KA"), SupplyRegion::CrossRegion);
    /// ```
    pub fn between(home_region: &str, place_of_supply: &str) -> Self {
        if home_region
            .trim()
            .eq_ignore_ascii_case(place_of_supply.trim())
        {
            SupplyRegion::SameRegion
        } else {
            SupplyRegion::CrossRegion
        }
    }

    #[inline]
    pub const fn is_cross_region(&self) -> bool {
        matches!(self, SupplyRegion::CrossRegion)
    }

    /// Stored boolean form.
    pub const fn from_cross_region_flag(cross_region: bool) -> Self {
        if cross_region {
            SupplyRegion::CrossRegion
        } else {
            SupplyRegion::SameRegion
        }
    }
}

// =============================================================================
// Tax Split
// =============================================================================

/// Tax for one line (or one order) divided between the regional components.
///
/// Either `component_a + component_b` or `cross_region` is non-zero, never
/// both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
pub struct TaxSplit {
    pub component_a: Money,
    pub component_b: Money,
    pub cross_region: Money,
}

impl TaxSplit {
    /// Splits a total tax amount for the given region.
    ///
    /// Same-region: component A takes the floored half and component B the
    /// rest, so `a + b == tax` exactly.
    pub fn split(tax: Money, region: SupplyRegion) -> Self {
        match region {
            SupplyRegion::SameRegion => {
                let (component_a, component_b) = tax.split_half();
                TaxSplit {
                    component_a,
                    component_b,
                    cross_region: Money::zero(),
                }
            }
            SupplyRegion::CrossRegion => TaxSplit {
                component_a: Money::zero(),
                component_b: Money::zero(),
                cross_region: tax,
            },
        }
    }

    /// Total tax across all components.
    #[inline]
    pub fn total(&self) -> Money {
        self.component_a + self.component_b + self.cross_region
    }

    /// Re-splits the already computed total for a new region.
    #[inline]
    pub fn resplit(&self, region: SupplyRegion) -> Self {
        TaxSplit::split(self.total(), region)
    }
}

// =============================================================================
// Line Computation
// =============================================================================

/// Everything the engine needs to price one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTaxInput {
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Option<DiscountInput>,
    pub tax_rate: TaxRate,
}

/// Computed money values of one line.
///
/// Built by [`compute_line`] or [`LineAmounts::assemble`] only, so
/// `line_total` is always derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct LineAmounts {
    /// quantity × unit price
    pub gross: Money,
    pub discount: Discount,
    /// gross − discount
    pub taxable: Money,
    pub tax_rate: TaxRate,
    pub tax: TaxSplit,
    /// taxable + all tax components
    pub line_total: Money,
}

impl LineAmounts {
    /// Assembles a line from its parts; `line_total` is always derived.
    pub fn assemble(
        gross: Money,
        discount: Discount,
        tax_rate: TaxRate,
        tax: TaxSplit,
    ) -> Self {
        let taxable = gross - discount.amount();
        LineAmounts {
            gross,
            discount,
            taxable,
            tax_rate,
            tax,
            line_total: taxable + tax.total(),
        }
    }

    /// Same line with its existing tax re-split for `region`.
    pub fn resplit(&self, region: SupplyRegion) -> Self {
        LineAmounts::assemble(self.gross, self.discount, self.tax_rate, self.tax.resplit(region))
    }
}

/// Prices one line and splits its tax for `region`.
///
/// ## Example
/// ```rust
/// use bahi_core::money::Money;
/// use bahi_core::tax::{compute_line, LineTaxInput, SupplyRegion};
/// use bahi_core::types::TaxRate;
///
/// let line = compute_line(
///     &LineTaxInput {
///         quantity: 2,
///         unit_price: Money::from_minor(10_000),
///         discount: None,
///         tax_rate: TaxRate::from_bps(1800),
///     },
///     SupplyRegion::SameRegion,
/// )
/// .unwrap();
///
/// assert_eq!(line.taxable.minor(), 20_000);
/// assert_eq!(line.tax.component_a.minor(), 1_800);
/// assert_eq!(line.tax.component_b.minor(), 1_800);
/// assert_eq!(line.line_total.minor(), 23_600);
/// ```
pub fn compute_line(input: &LineTaxInput, region: SupplyRegion) -> Result<LineAmounts, ValidationError> {
    validate_quantity(input.quantity)?;
    validate_price(input.unit_price)?;
    validate_tax_rate_bps(input.tax_rate.bps())?;

    let gross = input
        .unit_price
        .multiply_quantity(input.quantity)
        .ok_or_else(|| ValidationError::overflow("gross"))?;
    let discount = Discount::resolve(gross, input.discount)?;
    let taxable = gross - discount.amount();
    let tax = taxable
        .calculate_tax(input.tax_rate)
        .ok_or_else(|| ValidationError::overflow("tax"))?;
    let tax = TaxSplit::split(tax, region);

    Ok(LineAmounts::assemble(gross, discount, input.tax_rate, tax))
}

/// Re-splits every line for a changed place of supply.
///
/// Each line keeps its total tax; nothing is re-derived from taxable value.
pub fn resplit(lines: &[LineAmounts], region: SupplyRegion) -> Vec<LineAmounts> {
    lines.iter().map(|line| line.resplit(region)).collect()
}

// =============================================================================
// Order Totals
// =============================================================================

/// Order aggregates. Every field is the sum of the same field across lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub gross: Money,
    pub discount: Money,
    pub taxable: Money,
    pub component_a: Money,
    pub component_b: Money,
    pub cross_region: Money,
    pub grand_total: Money,
}

impl OrderTotals {
    /// Sums already computed lines.
    ///
    /// Fails with [`ValidationError::Overflow`] naming the first aggregate
    /// that leaves the i64 range.
    pub fn from_lines<'a>(
        lines: impl IntoIterator<Item = &'a LineAmounts>,
    ) -> Result<Self, ValidationError> {
        lines
            .into_iter()
            .try_fold(OrderTotals::default(), |totals, line| {
                Ok(OrderTotals {
                    gross: accumulate("gross", totals.gross, line.gross)?,
                    discount: accumulate("discount", totals.discount, line.discount.amount())?,
                    taxable: accumulate("taxable", totals.taxable, line.taxable)?,
                    component_a: accumulate("component_a", totals.component_a, line.tax.component_a)?,
                    component_b: accumulate("component_b", totals.component_b, line.tax.component_b)?,
                    cross_region: accumulate("cross_region", totals.cross_region, line.tax.cross_region)?,
                    grand_total: accumulate("grand_total", totals.grand_total, line.line_total)?,
                })
            })
    }

    #[inline]
    pub fn tax_total(&self) -> Money {
        self.component_a + self.component_b + self.cross_region
    }

    /// Grand total rounded to whole rupees, for printing.
    #[inline]
    pub fn rounded_grand_total(&self) -> Money {
        self.grand_total.round_to_whole_units()
    }
}

fn accumulate(field: &str, total: Money, value: Money) -> Result<Money, ValidationError> {
    total
        .checked_add(value)
        .ok_or_else(|| ValidationError::overflow(field))
}

// =============================================================================
// Unit Tests
// =============================================================================
