//! # Settlement Errors
//!
//! The one error type callers of the settlement service see.
//!
//! ```text
//! ┌──────────────────────────┬─────────────────────────────────────────────┐
//! │ Variant                  │ Caller action                               │
//! ├──────────────────────────┼─────────────────────────────────────────────┤
//! │ Validation               │ fix the input                               │
//! │ NotFound                 │ refresh, the entity is gone                 │
//! │ InsufficientStock        │ lower the quantity                          │
//! │ Aborted                  │ retry the whole operation                   │
//! │ PersistenceFailure       │ retry, then escalate                        │
//! └──────────────────────────┴─────────────────────────────────────────────┘
//! ```
//!
//! Every variant means nothing was written.

use thiserror::Error;

use crate::error::DbError;
use bahi_core::{CoreError, ValidationError};

#[derive(Debug, Error)]
pub enum SettlementError {
    /// Raised before any transaction begins.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Insufficient stock for {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: String,
        requested: i64,
        available: i64,
    },

    /// Lost a write race (busy database, failed commit). Safe to retry.
    #[error("Operation aborted: {0}")]
    Aborted(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl SettlementError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        SettlementError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SettlementError::Aborted(_) | SettlementError::PersistenceFailure(_)
        )
    }
}

impl From<CoreError> for SettlementError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ItemNotFound(id) => SettlementError::not_found("Item", id),
            CoreError::OrderNotFound(id) => SettlementError::not_found("Order", id),
            CoreError::InstallmentNotFound { installment_id, .. } => {
                SettlementError::not_found("Installment", installment_id)
            }
            CoreError::InsufficientStock {
                item_id,
                available,
                requested,
            } => SettlementError::InsufficientStock {
                item_id,
                requested,
                available,
            },
            CoreError::Validation(e) => SettlementError::from(e),
        }
    }
}

impl From<DbError> for SettlementError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => SettlementError::NotFound { entity, id },
            e if e.is_contention() => SettlementError::Aborted(e.to_string()),
            e => SettlementError::PersistenceFailure(e.to_string()),
        }
    }
}

pub type SettlementResult<T> = Result<T, SettlementError>;
