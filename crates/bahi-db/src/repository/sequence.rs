//! # Order Number Sequences
//!
//! Date-scoped counters behind human-readable order numbers.
//!
//! ```text
//! INV-20250314-0001   first sale of 14 March 2025
//! PUR-20250314-0003   third purchase of the same day
//! ```
//!
//! The counter is bumped inside the order's unit of work, so an aborted
//! order gives its number back.

use chrono::NaiveDate;
use sqlx::SqliteConnection;

use crate::error::DbResult;
use bahi_core::OrderKind;

/// Repository for `order_sequences`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceRepository;

impl SequenceRepository {
    /// Increments and returns the counter for `(kind, day)`, starting at 1.
    pub async fn next(conn: &mut SqliteConnection, kind: OrderKind, day: NaiveDate) -> DbResult<i64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO order_sequences (kind, day, last_value)
            VALUES (?1, ?2, 1)
            ON CONFLICT (kind, day) DO UPDATE SET last_value = last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(kind.as_str())
        .bind(day.format("%Y-%m-%d").to_string())
        .fetch_one(conn)
        .await?;

        Ok(value)
    }

    /// Formats `PREFIX-YYYYMMDD-NNNN`.
    pub fn order_number(kind: OrderKind, day: NaiveDate, value: i64) -> String {
        format!("{}-{}-{:04}", kind.number_prefix(), day.format("%Y%m%d"), value)
    }
}
