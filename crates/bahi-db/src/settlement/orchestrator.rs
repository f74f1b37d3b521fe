//! # Order Orchestrator
//!
//! Creates sales and purchases as one atomic unit: the order, its payment
//! ledger and every stock movement commit together or not at all.
//!
//! ## create_order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request ──────────────────────────── Validation (no BEGIN)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   1. per line: active item ─► compute_line ─► OrderLine (snapshot)      │
//! │      sales: Σ quantity per item ≤ stock ─────── InsufficientStock       │
//! │   2. next order number, INSERT order + lines                            │
//! │   3. ledger opened with the initial payment ─► order status             │
//! │   4. per line: UPDATE items … RETURNING ─► stock ledger entry           │
//! │  COMMIT ──────────────────────────────────── any error: ROLLBACK        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## cancel_order
//! Holds the order lock. Writes an `ADJUSTMENT` entry per line that puts
//! the quantity back where it came from, then marks the order cancelled.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use crate::ledger::{PaymentLedgerService, StockLedger};
use crate::pool::Database;
use crate::repository::{ItemRepository, OrderRepository, SequenceRepository};
use crate::settlement::error::{SettlementError, SettlementResult};
use bahi_core::tax::{compute_line, LineTaxInput};
use bahi_core::validation::{
    validate_counterparty_name, validate_initial_payment, validate_line_count, validate_note,
    validate_price, validate_quantity, validate_region_code, validate_uuid,
};
use bahi_core::{
    CounterpartySnapshot, DiscountInput, InstallmentInput, Money, Order, OrderKind, OrderLine,
    OrderStatus, OrderTotals, PaymentInstallment, PaymentLedger, StockLedgerEntry,
    StockMovement, SupplyRegion, ValidationError,
};

// =============================================================================
// Requests and Results
// =============================================================================

/// Request to create a sale or a purchase.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateOrderRequest {
    pub kind: OrderKind,
    /// Customer for sales, supplier for purchases.
    pub counterparty: CounterpartySnapshot,
    pub lines: Vec<OrderLineRequest>,
    /// Paid at the counter; zero or absent means nothing paid yet.
    #[serde(default)]
    pub initial_payment: Option<InstallmentInput>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One requested line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLineRequest {
    pub item_id: String,
    pub quantity: i64,
    /// Overrides the item master price (negotiated or supplier price).
    #[serde(default)]
    pub unit_price: Option<Money>,
    #[serde(default)]
    pub discount: Option<DiscountInput>,
}

impl CreateOrderRequest {
    /// Checks everything that can be checked without storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_counterparty_name(&self.counterparty.name)?;
        validate_region_code(&self.counterparty.region_code)?;
        validate_note("notes", self.notes.as_deref())?;
        validate_line_count(self.lines.len())?;

        for line in &self.lines {
            validate_uuid("item_id", &line.item_id)?;
            validate_quantity(line.quantity)?;
            if let Some(price) = line.unit_price {
                validate_price(price)?;
            }
        }

        if let Some(payment) = &self.initial_payment {
            validate_initial_payment(payment.amount)?;
            validate_note("note", payment.note.as_deref())?;
        }

        Ok(())
    }
}

/// Everything a committed order produced.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct Settlement {
    pub order: Order,
    pub ledger: PaymentLedger,
    pub stock_entries: Vec<StockLedgerEntry>,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Order creation, lookup and cancellation.
#[derive(Debug, Clone)]
pub struct OrderOrchestrator {
    db: Database,
    home_region: String,
}

impl OrderOrchestrator {
    /// `home_region` is the seller's own region code, compared against each
    /// order's place of supply.
    pub fn new(db: Database, home_region: impl Into<String>) -> Self {
        OrderOrchestrator {
            db,
            home_region: home_region.into().trim().to_string(),
        }
    }

    /// Creates an order with its ledger and stock movements in one unit of
    /// work.
    pub async fn create_order(&self, request: CreateOrderRequest) -> SettlementResult<Settlement> {
        request.validate()?;
        let region = SupplyRegion::between(&self.home_region, &request.counterparty.region_code);

        let mut uow = self.db.begin().await?;
        let result = self.create_in(uow.conn(), &request, region).await;
        let settlement = uow.finish(result).await?;

        let order = &settlement.order;
        info!(
            order_id = %order.id,
            number = %order.number,
            kind = order.kind.as_str(),
            lines = order.lines.len(),
            grand_total = order.totals.grand_total.minor(),
            status = order.status.as_str(),
            "Order created"
        );

        Ok(settlement)
    }

    async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        request: &CreateOrderRequest,
        region: SupplyRegion,
    ) -> SettlementResult<Settlement> {
        let now = Utc::now();
        let order_id = Uuid::new_v4().to_string();

        let lines = Self::price_lines(&mut *conn, &order_id, request, region).await?;
        let totals = OrderTotals::from_lines(lines.iter().map(|line| &line.amounts))?;

        let day = now.date_naive();
        let sequence = SequenceRepository::next(&mut *conn, request.kind, day).await?;
        let number = SequenceRepository::order_number(request.kind, day, sequence);

        let mut ledger = PaymentLedger::open(order_id.as_str(), totals.grand_total);
        if let Some(payment) = request.initial_payment.as_ref().filter(|p| p.amount.is_positive()) {
            ledger.add(PaymentInstallment::new(order_id.as_str(), payment, now))?;
        }

        let order = Order {
            id: order_id,
            kind: request.kind,
            number,
            counterparty: request.counterparty.clone(),
            home_region_code: self.home_region.clone(),
            supply_region: region,
            lines,
            totals,
            status: ledger.settled_order_status(OrderStatus::Pending),
            is_active: true,
            notes: request.notes.clone(),
            cancel_reason: None,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        };

        OrderRepository::insert(&mut *conn, &order).await?;
        PaymentLedgerService::persist_new(&mut *conn, &ledger, now).await?;

        let reference = order.reference();
        let mut stock_entries = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let movement = StockMovement::for_order(order.kind, line.quantity)?;
            let entry = StockLedger::record_movement(
                &mut *conn,
                &line.item_id,
                movement,
                Some(&reference),
                None,
                now,
            )
            .await?;
            stock_entries.push(entry);
        }

        Ok(Settlement {
            order,
            ledger,
            stock_entries,
        })
    }

    /// Resolves items, prices every line and, for sales, checks the summed
    /// demand per item against its stock.
    async fn price_lines(
        conn: &mut SqliteConnection,
        order_id: &str,
        request: &CreateOrderRequest,
        region: SupplyRegion,
    ) -> SettlementResult<Vec<OrderLine>> {
        let mut lines = Vec::with_capacity(request.lines.len());
        // item_id → (available, requested)
        let mut demand: BTreeMap<String, (i64, i64)> = BTreeMap::new();

        for (index, requested) in request.lines.iter().enumerate() {
            let item = ItemRepository::get_active(&mut *conn, &requested.item_id).await?;
            let unit_price = requested.unit_price.unwrap_or(item.unit_price);

            let amounts = compute_line(
                &LineTaxInput {
                    quantity: requested.quantity,
                    unit_price,
                    discount: requested.discount,
                    tax_rate: item.tax_rate,
                },
                region,
            )?;

            demand
                .entry(item.id.clone())
                .or_insert((item.current_stock, 0))
                .1 += requested.quantity;

            lines.push(OrderLine {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.to_string(),
                position: index as i64 + 1,
                item_id: item.id.clone(),
                item: item.snapshot(),
                quantity: requested.quantity,
                unit_price,
                amounts,
            });
        }

        if request.kind == OrderKind::Sale {
            if let Some((item_id, (available, requested))) = demand
                .into_iter()
                .find(|(_, (available, requested))| requested > available)
            {
                return Err(SettlementError::InsufficientStock {
                    item_id,
                    requested,
                    available,
                });
            }
        }

        Ok(lines)
    }

    /// Loads an order with its lines.
    pub async fn get_order(&self, order_id: &str) -> SettlementResult<Order> {
        validate_uuid("order_id", order_id)?;
        let mut conn = self.db.acquire().await?;
        OrderRepository::get(&mut conn, order_id)
            .await?
            .ok_or_else(|| SettlementError::not_found("Order", order_id))
    }

    /// Cancels an order and reverses its stock movements.
    pub async fn cancel_order(&self, order_id: &str, reason: &str) -> SettlementResult<Order> {
        validate_uuid("order_id", order_id)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::required("reason").into());
        }
        validate_note("reason", Some(reason))?;

        let _guard = self.db.coordinator().lock_order(order_id).await;

        let mut uow = self.db.begin().await?;
        let result = Self::cancel_in(uow.conn(), order_id, reason, Utc::now()).await;
        let order = uow.finish(result).await?;

        info!(
            order_id = %order.id,
            number = %order.number,
            reason = %reason,
            "Order cancelled"
        );

        Ok(order)
    }

    async fn cancel_in(
        conn: &mut SqliteConnection,
        order_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> SettlementResult<Order> {
        let order = OrderRepository::get(&mut *conn, order_id)
            .await?
            .ok_or_else(|| SettlementError::not_found("Order", order_id))?;

        if order.status == OrderStatus::Cancelled {
            return Err(ValidationError::InvalidTransition {
                entity: "order".to_string(),
                from: order.status.as_str().to_string(),
                to: OrderStatus::Cancelled.as_str().to_string(),
            }
            .into());
        }

        let reference = order.reference();
        for line in &order.lines {
            let movement = StockMovement::reversal(order.kind, line.quantity)?;
            StockLedger::record_movement(
                &mut *conn,
                &line.item_id,
                movement,
                Some(&reference),
                Some(reason),
                now,
            )
            .await?;
        }

        OrderRepository::mark_cancelled(&mut *conn, order_id, reason, now).await?;

        OrderRepository::get(conn, order_id)
            .await?
            .ok_or_else(|| SettlementError::not_found("Order", order_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
