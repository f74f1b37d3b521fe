//! # bahi-core: Pure Business Logic for Bahi
//!
//! The settlement rules of the Bahi back office as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Bahi Settlement Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Billing UI / HTTP layer (external collaborator)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ SettlementService                      │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │     bahi-db: orchestrator, ledgers, unit of work (SQLite)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ bahi-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │   tax   │ │ payment │ │  stock  │ │validate │  │   │
//! │  │   │  Money  │ │ TaxSplit│ │ Ledger  │ │Movement │ │  rules  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, Item, StockLedgerEntry, statuses)
//! - [`money`] - Money type with integer arithmetic (paise)
//! - [`tax`] - Tax engine: discounts, regional split, order totals
//! - [`payment`] - Payment ledger and its recompute rule
//! - [`stock`] - Stock movement direction and opening/closing math
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use bahi_core::money::Money;
//! use bahi_core::tax::{compute_line, LineTaxInput, SupplyRegion};
//! use bahi_core::types::TaxRate;
//!
//! let region = SupplyRegion::between("MH", "KA");
//! let line = compute_line(
//!     &LineTaxInput {
//!         quantity: 2,
//!         unit_price: Money::from_minor(10_000),
//!         discount: None,
//!         tax_rate: TaxRate::from_bps(1800),
//!     },
//!     region,
//! )
//! .unwrap();
//!
//! assert_eq!(line.tax.cross_region.minor(), 3_600);
//! assert_eq!(line.line_total.minor(), 23_600);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod payment;
pub mod stock;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use payment::{InstallmentInput, LedgerTotals, PaymentInstallment, PaymentLedger};
pub use stock::StockMovement;
pub use tax::{Discount, DiscountInput, LineAmounts, OrderTotals, SupplyRegion, TaxSplit};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines in a single order.
pub const MAX_ORDER_LINES: usize = 200;

/// Maximum quantity on a single line (and of a single adjustment).
///
/// Catches keying slips such as 10000 for 100.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Largest unit price, discount or installment amount in paise (₹10 crore).
///
/// With `MAX_LINE_QUANTITY` and `MAX_ORDER_LINES` this keeps every order and
/// ledger aggregate far inside i64.
pub const MAX_AMOUNT: i64 = 10_000_000_000;

/// Maximum length of notes and cancellation reasons.
pub const MAX_NOTE_LENGTH: usize = 500;
