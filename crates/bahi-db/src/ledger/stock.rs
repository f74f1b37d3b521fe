//! # Stock Ledger
//!
//! Append-only record of every stock movement, plus the only write path to
//! `items.current_stock`.
//!
//! ## Recording a Movement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  record_movement(conn, item, movement)       (caller's unit of work)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE items … RETURNING current_stock                                 │
//! │       │                                                                 │
//! │       ├── Some(closing) ──► opening = closing − delta                   │
//! │       │                     INSERT stock_ledger (…) RETURNING entry_no  │
//! │       │                                                                 │
//! │       └── None ──► item missing?  NotFound                              │
//! │                    otherwise      InsufficientStock { available }       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! For any item, each entry's opening stock equals the previous entry's
//! closing stock, because both come from the same serialized counter.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::MAX_HISTORY_PAGE_SIZE;
use crate::pool::Database;
use crate::repository::{ItemRepository, StockRepository};
use crate::settlement::error::{SettlementError, SettlementResult};
use bahi_core::validation::{validate_note, validate_uuid};
use bahi_core::{OrderReference, StockLedgerEntry, StockMovement, ValidationError};

/// Stock history reads and manual adjustments.
#[derive(Debug, Clone)]
pub struct StockLedger {
    db: Database,
    page_size: u32,
}

impl StockLedger {
    /// Creates the ledger with a default history page size, clamped to
    /// `1..=MAX_HISTORY_PAGE_SIZE`.
    pub fn new(db: Database, page_size: u32) -> Self {
        StockLedger {
            db,
            page_size: page_size.clamp(1, MAX_HISTORY_PAGE_SIZE),
        }
    }

    /// Applies one movement to the live counter and appends its entry.
    ///
    /// Runs on the caller's connection; the caller owns the transaction.
    pub async fn record_movement(
        conn: &mut SqliteConnection,
        item_id: &str,
        movement: StockMovement,
        reference: Option<&OrderReference>,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> SettlementResult<StockLedgerEntry> {
        let closing =
            ItemRepository::apply_stock_delta(&mut *conn, item_id, movement.delta(), now).await?;

        let Some(closing) = closing else {
            return Err(match ItemRepository::current_stock(&mut *conn, item_id).await? {
                None => SettlementError::not_found("Item", item_id),
                Some(available) => SettlementError::InsufficientStock {
                    item_id: item_id.to_string(),
                    requested: movement.outgoing().unwrap_or_default(),
                    available,
                },
            });
        };

        let mut entry = StockLedgerEntry {
            entry_no: 0,
            id: Uuid::new_v4().to_string(),
            item_id: item_id.to_string(),
            direction: movement.direction(),
            reference: reference.cloned(),
            quantity_delta: movement.delta(),
            opening_stock: movement.opening_from(closing),
            closing_stock: closing,
            reason: reason.map(str::to_string),
            recorded_at: now,
        };
        entry.entry_no = StockRepository::append(conn, &entry).await?;

        debug!(
            item_id = %item_id,
            entry_no = entry.entry_no,
            opening = entry.opening_stock,
            closing = entry.closing_stock,
            "Stock movement recorded"
        );

        Ok(entry)
    }

    /// Newest-first history of an item.
    ///
    /// `limit` defaults to the configured page size and never exceeds
    /// [`MAX_HISTORY_PAGE_SIZE`].
    pub async fn history(
        &self,
        item_id: &str,
        limit: Option<u32>,
    ) -> SettlementResult<Vec<StockLedgerEntry>> {
        self.page(item_id, None, limit).await
    }

    /// Continues a history listing with entries older than `before`.
    pub async fn history_before(
        &self,
        item_id: &str,
        before: i64,
        limit: Option<u32>,
    ) -> SettlementResult<Vec<StockLedgerEntry>> {
        self.page(item_id, Some(before), limit).await
    }

    async fn page(
        &self,
        item_id: &str,
        before: Option<i64>,
        limit: Option<u32>,
    ) -> SettlementResult<Vec<StockLedgerEntry>> {
        let limit = limit
            .unwrap_or(self.page_size)
            .clamp(1, MAX_HISTORY_PAGE_SIZE);

        let mut conn = self.db.acquire().await?;
        let entries = StockRepository::history(&mut conn, item_id, before, limit).await?;
        Ok(entries)
    }

    /// Records a manual correction in its own unit of work.
    ///
    /// A reason is mandatory. Negative deltas cannot take stock below zero.
    pub async fn adjust(
        &self,
        item_id: &str,
        delta: i64,
        reason: &str,
    ) -> SettlementResult<StockLedgerEntry> {
        validate_uuid("item_id", item_id)?;
        let movement = StockMovement::adjustment(delta)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::required("reason").into());
        }
        validate_note("reason", Some(reason))?;

        let mut uow = self.db.begin().await?;
        let result = Self::adjust_in(uow.conn(), item_id, movement, reason).await;
        let entry = uow.finish(result).await?;

        info!(
            item_id = %item_id,
            delta,
            closing = entry.closing_stock,
            "Stock adjusted"
        );

        Ok(entry)
    }

    async fn adjust_in(
        conn: &mut SqliteConnection,
        item_id: &str,
        movement: StockMovement,
        reason: &str,
    ) -> SettlementResult<StockLedgerEntry> {
        ItemRepository::get_active(&mut *conn, item_id).await?;
        Self::record_movement(conn, item_id, movement, None, Some(reason), Utc::now()).await
    }
}
