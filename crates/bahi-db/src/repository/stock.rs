//! # Stock Ledger Repository
//!
//! Append and read. There is no update or delete here, and the schema's
//! triggers reject them anyway.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use bahi_core::{OrderKind, OrderReference, StockDirection, StockLedgerEntry};

/// Repository for `stock_ledger`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockRepository;

#[derive(sqlx::FromRow)]
struct EntryRow {
    entry_no: i64,
    id: String,
    item_id: String,
    direction: StockDirection,
    order_kind: Option<OrderKind>,
    order_id: Option<String>,
    order_number: Option<String>,
    quantity_delta: i64,
    opening_stock: i64,
    closing_stock: i64,
    reason: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl From<EntryRow> for StockLedgerEntry {
    fn from(row: EntryRow) -> Self {
        let reference = match (row.order_kind, row.order_id, row.order_number) {
            (Some(kind), Some(order_id), Some(order_number)) => Some(OrderReference {
                kind,
                order_id,
                order_number,
            }),
            _ => None,
        };

        StockLedgerEntry {
            entry_no: row.entry_no,
            id: row.id,
            item_id: row.item_id,
            direction: row.direction,
            reference,
            quantity_delta: row.quantity_delta,
            opening_stock: row.opening_stock,
            closing_stock: row.closing_stock,
            reason: row.reason,
            recorded_at: row.recorded_at,
        }
    }
}

const SELECT_ENTRY: &str = r#"
    SELECT entry_no, id, item_id, direction,
           order_kind, order_id, order_number,
           quantity_delta, opening_stock, closing_stock, reason, recorded_at
    FROM stock_ledger
"#;

impl StockRepository {
    /// Appends an entry and returns its assigned `entry_no`.
    ///
    /// The `entry_no` field of `entry` is ignored.
    pub async fn append(conn: &mut SqliteConnection, entry: &StockLedgerEntry) -> DbResult<i64> {
        debug!(
            item_id = %entry.item_id,
            delta = entry.quantity_delta,
            closing = entry.closing_stock,
            "Appending stock ledger entry"
        );

        let reference = entry.reference.as_ref();
        let entry_no: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO stock_ledger (
                id, item_id, direction,
                order_kind, order_id, order_number,
                quantity_delta, opening_stock, closing_stock, reason, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            RETURNING entry_no
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.item_id)
        .bind(entry.direction)
        .bind(reference.map(|r| r.kind))
        .bind(reference.map(|r| r.order_id.as_str()))
        .bind(reference.map(|r| r.order_number.as_str()))
        .bind(entry.quantity_delta)
        .bind(entry.opening_stock)
        .bind(entry.closing_stock)
        .bind(&entry.reason)
        .bind(entry.recorded_at)
        .fetch_one(conn)
        .await?;

        Ok(entry_no)
    }

    /// Newest-first page of an item's history.
    ///
    /// With `before`, only entries older than that `entry_no` are returned.
    pub async fn history(
        conn: &mut SqliteConnection,
        item_id: &str,
        before: Option<i64>,
        limit: u32,
    ) -> DbResult<Vec<StockLedgerEntry>> {
        let sql = format!(
            "{SELECT_ENTRY} WHERE item_id = ?1 AND (?2 IS NULL OR entry_no < ?2) ORDER BY entry_no DESC LIMIT ?3"
        );

        let rows: Vec<EntryRow> = sqlx::query_as(&sql)
            .bind(item_id)
            .bind(before)
            .bind(limit)
            .fetch_all(conn)
            .await?;

        Ok(rows.into_iter().map(StockLedgerEntry::from).collect())
    }

    /// Entries caused by one order, oldest first.
    pub async fn for_order(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<StockLedgerEntry>> {
        let sql = format!("{SELECT_ENTRY} WHERE order_id = ?1 ORDER BY entry_no");

        let rows: Vec<EntryRow> = sqlx::query_as(&sql)
            .bind(order_id)
            .fetch_all(conn)
            .await?;

        Ok(rows.into_iter().map(StockLedgerEntry::from).collect())
    }
}
