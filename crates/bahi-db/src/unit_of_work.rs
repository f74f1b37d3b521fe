//! # Consistency Coordinator
//!
//! Unit-of-work boundary and per-order mutation serialization.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  lock_order(id) ─────────────────────────────────────────┐ (optional)   │
//! │       │                                                   │             │
//! │       ▼                                                   │             │
//! │  UnitOfWork::begin ──► conn() ──► repositories ...        │             │
//! │       │                                                   │             │
//! │       ▼                                                   │             │
//! │  finish(result)                                           │             │
//! │    Ok  → COMMIT   (commit failure → Busy / TransactionFailed)           │
//! │    Err → ROLLBACK (nothing written survives)              │             │
//! │       │                                                   │             │
//! │       ▼                                                   ▼             │
//! │  OrderGuard dropped ─► lock released, map entry reclaimed               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A dropped `UnitOfWork` that was never finished rolls back as well, so an
//! early `?` return cannot leave a half-written order behind.
//!
//! ## Write Lock
//! Every unit of work opens with `BEGIN IMMEDIATE` and holds SQLite's write
//! lock from its first statement. A deferred transaction that reads and then
//! writes cannot be upgraded once another connection has committed, and
//! SQLite fails it with `database is locked` without consulting the busy
//! timeout. With the lock taken up front, a second writer waits in `begin`
//! for up to the busy timeout and then reads committed state.

use dashmap::DashMap;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

const BEGIN_IMMEDIATE: &str = "BEGIN IMMEDIATE";

// =============================================================================
// Unit of Work
// =============================================================================

/// One database transaction spanning a whole settlement operation.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    /// Begins a write transaction on a pooled connection.
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let tx = pool.begin_with(BEGIN_IMMEDIATE).await?;
        debug!("Unit of work started");
        Ok(UnitOfWork { tx })
    }

    /// The transaction's connection. Every repository call of the operation
    /// goes through it.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    /// Commits every write of this unit of work.
    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await.map_err(|e| match DbError::from(e) {
            DbError::Busy(message) => DbError::Busy(message),
            other => DbError::TransactionFailed(other.to_string()),
        })?;
        debug!("Unit of work committed");
        Ok(())
    }

    /// Discards every write of this unit of work.
    pub async fn abort(self) {
        if let Err(e) = self.tx.rollback().await {
            warn!(error = %e, "Rollback failed; connection will be discarded");
        }
    }

    /// Commits on `Ok`, aborts on `Err`, and hands the result back.
    pub async fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E>
    where
        E: From<DbError> + Display,
    {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "Unit of work aborted");
                self.abort().await;
                Err(err)
            }
        }
    }
}

// =============================================================================
// Per-Order Locks
// =============================================================================

/// Table of per-order async mutexes.
///
/// Payment mutations and cancellation of the same order queue up here, so
/// each one reads the installment list only after the previous one has
/// committed.
#[derive(Debug, Clone, Default)]
pub struct Coordinator {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to one order.
    pub async fn lock_order(&self, order_id: &str) -> OrderGuard {
        let mutex = self
            .locks
            .entry(order_id.to_string())
            .or_default()
            .value()
            .clone();

        let guard = mutex.lock_owned().await;
        debug!(order_id = %order_id, "Order lock acquired");

        OrderGuard {
            order_id: order_id.to_string(),
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of orders with a live lock entry.
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive access to one order until dropped.
#[derive(Debug)]
pub struct OrderGuard {
    order_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl OrderGuard {
    pub fn order_id(&self) -> &str {
        &self.order_id
    }
}

impl Drop for OrderGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map still holds the mutex: nobody is waiting on it.
        self.locks
            .remove_if(&self.order_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_lock_excludes_and_is_reclaimed() {
        let coordinator = Coordinator::new();

        let guard = coordinator.lock_order("order-1").await;
        assert_eq!(guard.order_id(), "order-1");
        assert_eq!(coordinator.active_locks(), 1);

        let mutex = coordinator.locks.get("order-1").unwrap().value().clone();
        assert!(mutex.try_lock().is_err());
        drop(mutex);

        let other = coordinator.lock_order("order-2").await;
        assert_eq!(coordinator.active_locks(), 2);

        drop(guard);
        drop(other);
        assert_eq!(coordinator.active_locks(), 0);
    }

    #[tokio::test]
    async fn test_waiter_acquires_after_release() {
        let coordinator = Coordinator::new();
        let guard = coordinator.lock_order("order-1").await;

        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                let _guard = coordinator.lock_order("order-1").await;
            })
        };

        drop(guard);
        waiter.await.unwrap();
        assert_eq!(coordinator.active_locks(), 0);
    }

    #[tokio::test]
    async fn test_finish_rolls_back_on_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        sqlx::query("INSERT INTO order_sequences (kind, day, last_value) VALUES ('sale', '2025-01-01', 7)")
            .execute(uow.conn())
            .await
            .unwrap();
        let result: Result<(), DbError> = Err(DbError::Internal("boom".into()));
        assert!(uow.finish(result).await.is_err());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_sequences")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_second_writer_waits_for_first_commit() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("uow.db"))
            .max_connections(2)
            .busy_timeout(std::time::Duration::from_secs(10));
        let db = Database::new(config).await.unwrap();

        let mut first = db.begin().await.unwrap();
        sqlx::query("INSERT INTO order_sequences (kind, day, last_value) VALUES ('sale', '2025-01-01', 1)")
            .execute(first.conn())
            .await
            .unwrap();

        let second = {
            let db = db.clone();
            tokio::spawn(async move {
                let mut uow = db.begin().await?;
                let seen: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_sequences")
                    .fetch_one(uow.conn())
                    .await?;
                sqlx::query("UPDATE order_sequences SET last_value = last_value + 1")
                    .execute(uow.conn())
                    .await?;
                uow.commit().await?;
                Ok::<_, DbError>(seen)
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        first.commit().await.unwrap();

        // The second writer only started once the first had committed
        assert_eq!(second.await.unwrap().unwrap(), 1);
        let last: i64 = sqlx::query_scalar("SELECT last_value FROM order_sequences")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(last, 2);
    }

    #[tokio::test]
    async fn test_finish_commits_on_ok() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        sqlx::query("INSERT INTO order_sequences (kind, day, last_value) VALUES ('sale', '2025-01-01', 7)")
            .execute(uow.conn())
            .await
            .unwrap();
        uow.finish(Ok::<_, DbError>(())).await.unwrap();

        let last: i64 = sqlx::query_scalar("SELECT last_value FROM order_sequences")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(last, 7);
    }
}
