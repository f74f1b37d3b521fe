//! # Error Types
//!
//! Domain-specific error types for bahi-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bahi-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bahi-db errors (separate crate)                                       │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── SettlementError  - What callers of the settlement service see     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SettlementError ← DbError         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations detected without touching
/// storage, plus the not-found cases the ledgers raise once an order has been
/// loaded.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Item cannot be found or is inactive.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Order cannot be found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// The installment id does not belong to the order's ledger.
    ///
    /// ## When This Occurs
    /// - Editing or removing an installment that was already removed
    /// - Passing an installment id from a different order
    #[error("Installment {installment_id} not found on order {order_id}")]
    InstallmentNotFound {
        order_id: String,
        installment_id: String,
    },

    /// Insufficient stock to complete a sale (or reverse a purchase).
    ///
    /// ## User Workflow
    /// ```text
    /// Sale line (qty: 5)
    ///      │
    ///      ▼
    /// Conditional decrement: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { item_id, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole order aborted, stock stays 3
    /// ```
    #[error("Insufficient stock for {item_id}: available {available}, requested {requested}")]
    InsufficientStock {
        item_id: String,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any unit of work begins.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, malformed region code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// An aggregate no longer fits in a paise amount.
    #[error("{field} exceeds the largest representable amount")]
    Overflow { field: String },

    /// Lifecycle transition that is not allowed.
    ///
    /// ## When This Occurs
    /// - Cancelling an order that is already cancelled
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::MustBePositive`].
    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::Overflow`].
    pub fn overflow(field: impl Into<String>) -> Self {
        ValidationError::Overflow {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::InvalidFormat`].
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            item_id: "item-1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for item-1: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("lines").to_string(),
            "lines is required"
        );
        assert_eq!(
            ValidationError::must_be_positive("quantity").to_string(),
            "quantity must be positive"
        );

        let err = ValidationError::InvalidTransition {
            entity: "order".to_string(),
            from: "cancelled".to_string(),
            to: "cancelled".to_string(),
        };
        assert_eq!(err.to_string(), "order cannot move from cancelled to cancelled");
        assert_eq!(
            ValidationError::overflow("grand_total").to_string(),
            "grand_total exceeds the largest representable amount"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("item_id").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
