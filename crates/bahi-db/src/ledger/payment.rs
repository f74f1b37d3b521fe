//! # Payment Ledger Service
//!
//! Installment mutations for one order at a time.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  lock_order(order_id)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │    order status ──► NotFound if the order is missing                    │
//! │    load ledger (installments, totals recomputed)                        │
//! │    add / update / remove ──► PaymentLedger::recompute                   │
//! │    write installment row                                                │
//! │    write LedgerTotals (one UPDATE)                                      │
//! │    order status from ledger (cancelled stays cancelled)                 │
//! │  COMMIT                                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  guard dropped                                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::info;

use crate::pool::Database;
use crate::repository::{OrderRepository, PaymentRepository};
use crate::settlement::error::{SettlementError, SettlementResult};
use bahi_core::validation::validate_uuid;
use bahi_core::{InstallmentInput, PaymentInstallment, PaymentLedger};

/// Which installment change to apply once the ledger is loaded.
enum Change<'a> {
    Add(&'a InstallmentInput),
    Update(&'a str, &'a InstallmentInput),
    Remove(&'a str),
}

/// Payment ledger operations.
#[derive(Debug, Clone)]
pub struct PaymentLedgerService {
    db: Database,
}

impl PaymentLedgerService {
    pub fn new(db: Database) -> Self {
        PaymentLedgerService { db }
    }

    /// Records a new installment.
    pub async fn add_installment(
        &self,
        order_id: &str,
        input: &InstallmentInput,
    ) -> SettlementResult<PaymentLedger> {
        validate_uuid("order_id", order_id)?;
        input.validate()?;
        self.mutate(order_id, Change::Add(input)).await
    }

    /// Edits an existing installment's amount, method and note.
    pub async fn update_installment(
        &self,
        order_id: &str,
        installment_id: &str,
        input: &InstallmentInput,
    ) -> SettlementResult<PaymentLedger> {
        validate_uuid("order_id", order_id)?;
        validate_uuid("installment_id", installment_id)?;
        input.validate()?;
        self.mutate(order_id, Change::Update(installment_id, input))
            .await
    }

    /// Deletes an installment.
    pub async fn remove_installment(
        &self,
        order_id: &str,
        installment_id: &str,
    ) -> SettlementResult<PaymentLedger> {
        validate_uuid("order_id", order_id)?;
        validate_uuid("installment_id", installment_id)?;
        self.mutate(order_id, Change::Remove(installment_id)).await
    }

    /// Read-only view of an order's ledger.
    pub async fn get_ledger(&self, order_id: &str) -> SettlementResult<PaymentLedger> {
        validate_uuid("order_id", order_id)?;
        let mut conn = self.db.acquire().await?;
        PaymentRepository::load(&mut conn, order_id)
            .await?
            .ok_or_else(|| SettlementError::not_found("Order", order_id))
    }

    /// Persists the ledger of a freshly created order: header row plus any
    /// installments it was opened with.
    pub async fn persist_new(
        conn: &mut SqliteConnection,
        ledger: &PaymentLedger,
        now: DateTime<Utc>,
    ) -> SettlementResult<()> {
        PaymentRepository::insert_ledger(&mut *conn, ledger.order_id(), &ledger.totals(), now)
            .await?;
        for installment in ledger.installments() {
            PaymentRepository::insert_installment(&mut *conn, installment).await?;
        }
        Ok(())
    }

    async fn mutate(&self, order_id: &str, change: Change<'_>) -> SettlementResult<PaymentLedger> {
        let _guard = self.db.coordinator().lock_order(order_id).await;

        let mut uow = self.db.begin().await?;
        let result = Self::apply(uow.conn(), order_id, change).await;
        let ledger = uow.finish(result).await?;

        let totals = ledger.totals();
        info!(
            order_id = %order_id,
            total_paid = totals.total_paid.minor(),
            balance = totals.balance.minor(),
            status = ?totals.status,
            "Payment ledger updated"
        );

        Ok(ledger)
    }

    async fn apply(
        conn: &mut SqliteConnection,
        order_id: &str,
        change: Change<'_>,
    ) -> SettlementResult<PaymentLedger> {
        let now = Utc::now();

        let status = OrderRepository::status(&mut *conn, order_id)
            .await?
            .ok_or_else(|| SettlementError::not_found("Order", order_id))?;
        let mut ledger = PaymentRepository::load(&mut *conn, order_id)
            .await?
            .ok_or_else(|| SettlementError::not_found("Order", order_id))?;

        match change {
            Change::Add(input) => {
                let installment = PaymentInstallment::new(order_id, input, now);
                ledger.add(installment.clone())?;
                PaymentRepository::insert_installment(&mut *conn, &installment).await?;
            }
            Change::Update(installment_id, input) => {
                ledger.update(installment_id, input)?;
                if let Some(updated) = ledger.installment(installment_id) {
                    PaymentRepository::update_installment(&mut *conn, updated).await?;
                }
            }
            Change::Remove(installment_id) => {
                ledger.remove(installment_id)?;
                PaymentRepository::delete_installment(&mut *conn, order_id, installment_id)
                    .await?;
            }
        }

        PaymentRepository::write_totals(&mut *conn, order_id, &ledger.totals(), now).await?;

        let next = ledger.settled_order_status(status);
        if next != status {
            OrderRepository::set_status(conn, order_id, next, now).await?;
        }

        Ok(ledger)
    }
}
