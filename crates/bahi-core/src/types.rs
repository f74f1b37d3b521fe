//! # Domain Types
//!
//! Core domain types used throughout Bahi.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   OrderLine     │   │ StockLedgerEntry│       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  order_id (FK)  │   │  entry_no       │       │
//! │  │  number         │   │  item snapshot  │   │  direction      │       │
//! │  │  counterparty   │   │  LineAmounts    │   │  opening/closing│       │
//! │  │  OrderTotals    │   └─────────────────┘   └─────────────────┘       │
//! │  └────────┬────────┘                                                   │
//! │           │ 1:1                                                         │
//! │  ┌────────▼────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ PaymentLedger   │   │   OrderStatus   │   │ StockDirection  │       │
//! │  │  (payment.rs)   │   │  Pending        │   │  IN             │       │
//! │  │  installments   │   │  Completed      │   │  OUT            │       │
//! │  │  LedgerTotals   │   │  Cancelled      │   │  ADJUSTMENT     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Counterparty and item data are copied onto the order when it is created.
//! Reads of an order never consult live master data again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::tax::{LineAmounts, OrderTotals, SupplyRegion};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18% (standard goods rate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Order Kind
// =============================================================================

/// Sales and purchases share one shape; the kind decides the counterparty
/// role, the number prefix and the stock direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Goods leave the store to a customer.
    Sale,
    /// Goods arrive from a supplier.
    Purchase,
}

impl OrderKind {
    /// Prefix of the human-readable order number.
    pub const fn number_prefix(&self) -> &'static str {
        match self {
            OrderKind::Sale => "INV",
            OrderKind::Purchase => "PUR",
        }
    }

    /// Stored form, matches the sqlx encoding.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Sale => "sale",
            OrderKind::Purchase => "purchase",
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Settlement status of an order.
///
/// ```text
///   pending ──(balance ≤ 0)──► completed
///      ▲                          │
///      └──(balance > 0 again)─────┘
///   pending | completed ──(explicit cancel)──► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Balance still outstanding.
    #[default]
    Pending,
    /// Payment ledger is fully paid.
    Completed,
    /// Explicitly cancelled; payment mutations never leave this state.
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Derives the order status from its payment ledger.
    ///
    /// A cancelled order stays cancelled.
    pub const fn from_ledger(current: OrderStatus, ledger: LedgerStatus) -> OrderStatus {
        match (current, ledger) {
            (OrderStatus::Cancelled, _) => OrderStatus::Cancelled,
            (_, LedgerStatus::FullyPaid) => OrderStatus::Completed,
            _ => OrderStatus::Pending,
        }
    }
}

// =============================================================================
// Ledger Status
// =============================================================================

/// Payment status, derived from paid amount and balance only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    #[default]
    Unpaid,
    PartiallyPaid,
    FullyPaid,
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Upi,
    Card,
    BankTransfer,
    Cheque,
    Other,
}

// =============================================================================
// Stock Direction
// =============================================================================

/// Direction of a stock ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockDirection {
    /// Purchase receipt.
    In,
    /// Sale issue.
    Out,
    /// Manual correction or cancellation reversal.
    Adjustment,
}

// =============================================================================
// Item
// =============================================================================

/// An item from the item master, as this core reads it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Item {
    pub id: String,
    pub name: String,
    /// HSN / tax classification code.
    pub hsn_code: Option<String>,
    pub unit_price: Money,
    pub tax_rate: TaxRate,
    /// Live stock counter. Only the stock ledger mutates it.
    pub current_stock: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Freezes the fields an order line keeps.
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            name: self.name.clone(),
            hsn_code: self.hsn_code.clone(),
            tax_rate: self.tax_rate,
        }
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// Counterparty (customer or supplier) as captured at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CounterpartySnapshot {
    /// Master-data id; walk-in customers have none.
    pub id: Option<String>,
    pub name: String,
    /// Place-of-supply region code.
    pub region_code: String,
}

/// Item data frozen onto an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemSnapshot {
    pub name: String,
    pub hsn_code: Option<String>,
    pub tax_rate: TaxRate,
}

// =============================================================================
// Order
// =============================================================================

/// A persisted order line.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    /// One-based position within the order.
    pub position: i64,
    pub item_id: String,
    pub item: ItemSnapshot,
    pub quantity: i64,
    pub unit_price: Money,
    pub amounts: LineAmounts,
}

/// A sale or purchase order with its lines and aggregated totals.
///
/// Serialized for callers, never deserialized: orders are only built by the
/// orchestrator or loaded from storage.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub kind: OrderKind,
    /// Human-readable number, e.g. `INV-20250101-0001`.
    pub number: String,
    pub counterparty: CounterpartySnapshot,
    /// Seller home region at order time.
    pub home_region_code: String,
    pub supply_region: SupplyRegion,
    pub lines: Vec<OrderLine>,
    pub totals: OrderTotals,
    pub status: OrderStatus,
    /// Orders are never hard-deleted.
    pub is_active: bool,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Reference recorded on stock ledger entries.
    pub fn reference(&self) -> OrderReference {
        OrderReference {
            kind: self.kind,
            order_id: self.id.clone(),
            order_number: self.number.clone(),
        }
    }
}

/// Originating order of a stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderReference {
    pub kind: OrderKind,
    pub order_id: String,
    pub order_number: String,
}

// =============================================================================
// Stock Ledger Entry
// =============================================================================

/// One immutable stock movement.
///
/// `closing_stock == opening_stock + quantity_delta` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockLedgerEntry {
    /// Monotonic sequence number; orders history and serves as cursor.
    pub entry_no: i64,
    pub id: String,
    pub item_id: String,
    pub direction: StockDirection,
    /// Absent for manual adjustments.
    pub reference: Option<OrderReference>,
    /// Signed: negative for stock leaving.
    pub quantity_delta: i64,
    pub opening_stock: i64,
    pub closing_stock: i64,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

impl StockLedgerEntry {
    /// Checks the opening/closing arithmetic of this entry.
    pub fn is_balanced(&self) -> bool {
        self.opening_stock + self.quantity_delta == self.closing_stock
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
