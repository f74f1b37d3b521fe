//! # Payment Repository
//!
//! Ledger header rows and installment rows.
//!
//! The header's derived columns (`total_paid`, `balance`, `status`) are only
//! ever written together by [`PaymentRepository::write_totals`], from a
//! `LedgerTotals` computed in bahi-core. Loading ignores them and recomputes.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use bahi_core::{LedgerTotals, Money, PaymentInstallment, PaymentLedger, PaymentMethod};

/// Repository for `payment_ledgers` and `payment_installments`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentRepository;

#[derive(sqlx::FromRow)]
struct InstallmentRow {
    id: String,
    order_id: String,
    amount: i64,
    method: PaymentMethod,
    note: Option<String>,
    paid_at: DateTime<Utc>,
}

impl From<InstallmentRow> for PaymentInstallment {
    fn from(row: InstallmentRow) -> Self {
        PaymentInstallment {
            id: row.id,
            order_id: row.order_id,
            amount: Money::from_minor(row.amount),
            method: row.method,
            note: row.note,
            paid_at: row.paid_at,
        }
    }
}

impl PaymentRepository {
    /// Creates the ledger header for a new order.
    pub async fn insert_ledger(
        conn: &mut SqliteConnection,
        order_id: &str,
        totals: &LedgerTotals,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payment_ledgers (order_id, order_total, total_paid, balance, status, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(order_id)
        .bind(totals.order_total.minor())
        .bind(totals.total_paid.minor())
        .bind(totals.balance.minor())
        .bind(totals.status)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Loads a ledger and recomputes its totals from the installments.
    ///
    /// Installments come back in payment order (ties broken by insertion).
    pub async fn load(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Option<PaymentLedger>> {
        let order_total: Option<i64> =
            sqlx::query_scalar("SELECT order_total FROM payment_ledgers WHERE order_id = ?1")
                .bind(order_id)
                .fetch_optional(&mut *conn)
                .await?;

        let Some(order_total) = order_total else {
            return Ok(None);
        };

        let rows: Vec<InstallmentRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, amount, method, note, paid_at
            FROM payment_installments
            WHERE order_id = ?1
            ORDER BY paid_at, rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(conn)
        .await?;

        let ledger = PaymentLedger::restore(
            order_id,
            Money::from_minor(order_total),
            rows.into_iter().map(PaymentInstallment::from).collect(),
        )
        .map_err(|e| DbError::Internal(format!("ledger {order_id} cannot be rebuilt: {e}")))?;

        Ok(Some(ledger))
    }

    pub async fn insert_installment(
        conn: &mut SqliteConnection,
        installment: &PaymentInstallment,
    ) -> DbResult<()> {
        debug!(
            id = %installment.id,
            order_id = %installment.order_id,
            amount = installment.amount.minor(),
            "Inserting installment"
        );

        sqlx::query(
            r#"
            INSERT INTO payment_installments (id, order_id, amount, method, note, paid_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&installment.id)
        .bind(&installment.order_id)
        .bind(installment.amount.minor())
        .bind(installment.method)
        .bind(&installment.note)
        .bind(installment.paid_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Rewrites amount, method and note of an installment.
    pub async fn update_installment(
        conn: &mut SqliteConnection,
        installment: &PaymentInstallment,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE payment_installments
            SET amount = ?3, method = ?4, note = ?5
            WHERE id = ?1 AND order_id = ?2
            "#,
        )
        .bind(&installment.id)
        .bind(&installment.order_id)
        .bind(installment.amount.minor())
        .bind(installment.method)
        .bind(&installment.note)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn delete_installment(
        conn: &mut SqliteConnection,
        order_id: &str,
        installment_id: &str,
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM payment_installments WHERE id = ?1 AND order_id = ?2")
            .bind(installment_id)
            .bind(order_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Writes the derived totals in a single statement.
    pub async fn write_totals(
        conn: &mut SqliteConnection,
        order_id: &str,
        totals: &LedgerTotals,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE payment_ledgers
            SET total_paid = ?2, balance = ?3, status = ?4, updated_at = ?5
            WHERE order_id = ?1
            "#,
        )
        .bind(order_id)
        .bind(totals.total_paid.minor())
        .bind(totals.balance.minor())
        .bind(totals.status)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }
}
