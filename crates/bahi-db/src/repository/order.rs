//! # Order Repository
//!
//! Order headers and their lines.
//!
//! Lines store the item snapshot (name, HSN code, tax rate) taken at order
//! time, so later item master edits never change a settled order.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use bahi_core::{
    CounterpartySnapshot, Discount, ItemSnapshot, LineAmounts, Money, Order, OrderKind, OrderLine,
    OrderStatus, OrderTotals, SupplyRegion, TaxRate, TaxSplit,
};

/// Repository for the `orders` and `order_lines` tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderRepository;

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    kind: OrderKind,
    number: String,
    counterparty_id: Option<String>,
    counterparty_name: String,
    counterparty_region: String,
    home_region: String,
    is_cross_region: bool,
    gross: i64,
    discount: i64,
    taxable: i64,
    component_a: i64,
    component_b: i64,
    cross_region: i64,
    grand_total: i64,
    status: OrderStatus,
    is_active: bool,
    notes: Option<String>,
    cancel_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    id: String,
    order_id: String,
    position: i64,
    item_id: String,
    item_name: String,
    hsn_code: Option<String>,
    tax_rate_bps: u32,
    quantity: i64,
    unit_price: i64,
    gross: i64,
    discount_amount: i64,
    discount_bps: u32,
    component_a: i64,
    component_b: i64,
    cross_region: i64,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        let tax_rate = TaxRate::from_bps(row.tax_rate_bps);
        let amounts = LineAmounts::assemble(
            Money::from_minor(row.gross),
            Discount::restore(Money::from_minor(row.discount_amount), row.discount_bps),
            tax_rate,
            TaxSplit {
                component_a: Money::from_minor(row.component_a),
                component_b: Money::from_minor(row.component_b),
                cross_region: Money::from_minor(row.cross_region),
            },
        );

        OrderLine {
            id: row.id,
            order_id: row.order_id,
            position: row.position,
            item_id: row.item_id,
            item: ItemSnapshot {
                name: row.item_name,
                hsn_code: row.hsn_code,
                tax_rate,
            },
            quantity: row.quantity,
            unit_price: Money::from_minor(row.unit_price),
            amounts,
        }
    }
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Order {
        Order {
            id: self.id,
            kind: self.kind,
            number: self.number,
            counterparty: CounterpartySnapshot {
                id: self.counterparty_id,
                name: self.counterparty_name,
                region_code: self.counterparty_region,
            },
            home_region_code: self.home_region,
            supply_region: SupplyRegion::from_cross_region_flag(self.is_cross_region),
            lines,
            totals: OrderTotals {
                gross: Money::from_minor(self.gross),
                discount: Money::from_minor(self.discount),
                taxable: Money::from_minor(self.taxable),
                component_a: Money::from_minor(self.component_a),
                component_b: Money::from_minor(self.component_b),
                cross_region: Money::from_minor(self.cross_region),
                grand_total: Money::from_minor(self.grand_total),
            },
            status: self.status,
            is_active: self.is_active,
            notes: self.notes,
            cancel_reason: self.cancel_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
            cancelled_at: self.cancelled_at,
        }
    }
}

impl OrderRepository {
    /// Inserts an order header and all of its lines.
    pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, number = %order.number, lines = order.lines.len(), "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, kind, number,
                counterparty_id, counterparty_name, counterparty_region,
                home_region, is_cross_region,
                gross, discount, taxable, component_a, component_b, cross_region, grand_total,
                status, is_active, notes, cancel_reason,
                created_at, updated_at, cancelled_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6,
                ?7, ?8,
                ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                ?16, ?17, ?18, ?19,
                ?20, ?21, ?22
            )
            "#,
        )
        .bind(&order.id)
        .bind(order.kind)
        .bind(&order.number)
        .bind(&order.counterparty.id)
        .bind(&order.counterparty.name)
        .bind(&order.counterparty.region_code)
        .bind(&order.home_region_code)
        .bind(order.supply_region.is_cross_region())
        .bind(order.totals.gross.minor())
        .bind(order.totals.discount.minor())
        .bind(order.totals.taxable.minor())
        .bind(order.totals.component_a.minor())
        .bind(order.totals.component_b.minor())
        .bind(order.totals.cross_region.minor())
        .bind(order.totals.grand_total.minor())
        .bind(order.status)
        .bind(order.is_active)
        .bind(&order.notes)
        .bind(&order.cancel_reason)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.cancelled_at)
        .execute(&mut *conn)
        .await?;

        for line in &order.lines {
            Self::insert_line(&mut *conn, line).await?;
        }

        Ok(())
    }

    async fn insert_line(conn: &mut SqliteConnection, line: &OrderLine) -> DbResult<()> {
        let amounts = &line.amounts;

        sqlx::query(
            r#"
            INSERT INTO order_lines (
                id, order_id, position, item_id,
                item_name, hsn_code, tax_rate_bps,
                quantity, unit_price, gross, discount_amount, discount_bps, taxable,
                component_a, component_b, cross_region, line_total
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17
            )
            "#,
        )
        .bind(&line.id)
        .bind(&line.order_id)
        .bind(line.position)
        .bind(&line.item_id)
        .bind(&line.item.name)
        .bind(&line.item.hsn_code)
        .bind(line.item.tax_rate.bps())
        .bind(line.quantity)
        .bind(line.unit_price.minor())
        .bind(amounts.gross.minor())
        .bind(amounts.discount.amount().minor())
        .bind(amounts.discount.percent_bps())
        .bind(amounts.taxable.minor())
        .bind(amounts.tax.component_a.minor())
        .bind(amounts.tax.component_b.minor())
        .bind(amounts.tax.cross_region.minor())
        .bind(amounts.line_total.minor())
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Loads an order with its lines in position order.
    pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
        let header: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, kind, number,
                   counterparty_id, counterparty_name, counterparty_region,
                   home_region, is_cross_region,
                   gross, discount, taxable, component_a, component_b, cross_region, grand_total,
                   status, is_active, notes, cancel_reason,
                   created_at, updated_at, cancelled_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let lines: Vec<OrderLineRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, position, item_id,
                   item_name, hsn_code, tax_rate_bps,
                   quantity, unit_price, gross, discount_amount, discount_bps,
                   component_a, component_b, cross_region
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(conn)
        .await?;

        Ok(Some(
            header.into_order(lines.into_iter().map(OrderLine::from).collect()),
        ))
    }

    /// Current status only; cheaper than loading the whole order.
    pub async fn status(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<OrderStatus>> {
        let status: Option<OrderStatus> =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = ?1")
                .bind(id)
                .fetch_optional(conn)
                .await?;

        Ok(status)
    }

    /// Writes a status derived from the payment ledger.
    pub async fn set_status(
        conn: &mut SqliteConnection,
        id: &str,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, status = status.as_str(), "Updating order status");

        sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(now)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Marks an order cancelled and inactive, keeping its reason.
    pub async fn mark_cancelled(
        conn: &mut SqliteConnection,
        id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, "Cancelling order");

        sqlx::query(
            r#"
            UPDATE orders
            SET status = ?2,
                is_active = 0,
                cancel_reason = ?3,
                cancelled_at = ?4,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(OrderStatus::Cancelled)
        .bind(reason)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }
}
