//! # Stock Movement Math
//!
//! Direction and signed delta of every stock change, and the
//! opening/closing arithmetic the stock ledger persists.
//!
//! | Cause                    | Direction    | Delta |
//! |--------------------------|--------------|-------|
//! | Sale line                | `OUT`        | −qty  |
//! | Purchase line            | `IN`         | +qty  |
//! | Cancelled sale line      | `ADJUSTMENT` | +qty  |
//! | Cancelled purchase line  | `ADJUSTMENT` | −qty  |
//! | Manual correction        | `ADJUSTMENT` | ±n    |

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{OrderKind, StockDirection, StockLedgerEntry};
use crate::validation::{validate_adjustment_delta, validate_quantity};

/// A signed change to one item's stock counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    direction: StockDirection,
    delta: i64,
}

impl StockMovement {
    /// Movement caused by an order line.
    pub fn for_order(kind: OrderKind, quantity: i64) -> Result<Self, ValidationError> {
        validate_quantity(quantity)?;
        Ok(match kind {
            OrderKind::Sale => StockMovement {
                direction: StockDirection::Out,
                delta: -quantity,
            },
            OrderKind::Purchase => StockMovement {
                direction: StockDirection::In,
                delta: quantity,
            },
        })
    }

    /// Offsetting adjustment for a cancelled order line.
    pub fn reversal(kind: OrderKind, quantity: i64) -> Result<Self, ValidationError> {
        let original = StockMovement::for_order(kind, quantity)?;
        Ok(StockMovement {
            direction: StockDirection::Adjustment,
            delta: -original.delta,
        })
    }

    /// Manual correction.
    pub fn adjustment(delta: i64) -> Result<Self, ValidationError> {
        validate_adjustment_delta(delta)?;
        Ok(StockMovement {
            direction: StockDirection::Adjustment,
            delta,
        })
    }

    #[inline]
    pub const fn direction(&self) -> StockDirection {
        self.direction
    }

    #[inline]
    pub const fn delta(&self) -> i64 {
        self.delta
    }

    /// Quantity leaving stock, if any. Such movements need availability.
    #[inline]
    pub const fn outgoing(&self) -> Option<i64> {
        if self.delta < 0 {
            Some(-self.delta)
        } else {
            None
        }
    }

    /// Opening stock given the closing stock after this movement.
    #[inline]
    pub const fn opening_from(&self, closing: i64) -> i64 {
        closing - self.delta
    }

    /// Closing stock given the opening stock before this movement.
    #[inline]
    pub const fn closing_from(&self, opening: i64) -> i64 {
        opening + self.delta
    }
}

/// Checks a newest-first history page: every entry balances and each entry's
/// opening equals the previous (older) entry's closing.
pub fn is_continuous(newest_first: &[StockLedgerEntry]) -> bool {
    newest_first.iter().all(StockLedgerEntry::is_balanced)
        && newest_first
            .windows(2)
            .all(|pair| pair[0].opening_stock == pair[1].closing_stock)
}

// =============================================================================
// Unit Tests
// =============================================================================
