//! # Validation Module
//!
//! Input validation for settlement requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Settlement service (Rust)                                    │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: rules checked before any unit of work begins         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── CHECK constraints (amount > 0, closing = opening + delta)         │
//! │  ├── UNIQUE constraints (order number)                                 │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bahi_core::validation::{validate_quantity, validate_region_code};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_region_code("MH").is_ok());
//! ```

use crate::error::ValidationError;
use crate::money::{Money, BPS_SCALE};
use crate::{MAX_AMOUNT, MAX_LINE_QUANTITY, MAX_NOTE_LENGTH, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a region (place-of-supply) code.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 8 characters, letters and digits only
pub fn validate_region_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("region_code"));
    }

    if code.len() > 8 {
        return Err(ValidationError::TooLong {
            field: "region_code".to_string(),
            max: 8,
        });
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::invalid_format(
            "region_code",
            "must contain only letters and digits",
        ));
    }

    Ok(())
}

/// Validates a counterparty display name.
pub fn validate_counterparty_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("counterparty_name"));
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "counterparty_name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an optional free-text note or reason.
pub fn validate_note(field: &str, note: Option<&str>) -> ValidationResult<()> {
    match note {
        Some(text) if text.len() > MAX_NOTE_LENGTH => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTE_LENGTH,
        }),
        _ => Ok(()),
    }
}

/// Validates a UUID string (order, item, installment ids).
///
/// ## Example
/// ```rust
/// use bahi_core::validation::validate_uuid;
///
/// assert!(validate_uuid("order_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("order_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::invalid_format(field, "must be a valid UUID"))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }

    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (free items), negatives are not.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit_price".to_string(),
        });
    }

    validate_max_amount("unit_price", price)
}

/// Rejects amounts above `MAX_AMOUNT`.
fn validate_max_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.minor() > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0 to 100 %).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps as i64 > BPS_SCALE {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: BPS_SCALE,
        });
    }

    Ok(())
}

/// Validates a discount percentage in basis points (0 to 100 %).
pub fn validate_discount_percent(bps: u32) -> ValidationResult<()> {
    if bps as i64 > BPS_SCALE {
        return Err(ValidationError::OutOfRange {
            field: "discount_percent".to_string(),
            min: 0,
            max: BPS_SCALE,
        });
    }

    Ok(())
}

/// Validates an installment amount. Installments are strictly positive.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::must_be_positive("amount"));
    }

    validate_max_amount("amount", amount)
}

/// Validates the initial payment declared with a new order.
///
/// Zero means "nothing paid yet" and is allowed.
pub fn validate_initial_payment(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "initial_payment".to_string(),
        });
    }

    validate_max_amount("initial_payment", amount)
}

/// Validates a stock adjustment delta.
pub fn validate_adjustment_delta(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::invalid_format("delta", "must not be zero"));
    }

    if delta.abs() > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "delta".to_string(),
            min: -MAX_LINE_QUANTITY,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in an order.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::required("lines"));
    }

    if count > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_region_code() {
        assert!(validate_region_code("MH").is_ok());
        assert!(validate_region_code(" 27 ").is_ok());
        assert!(validate_region_code("").is_err());
        assert!(validate_region_code("   ").is_err());
        assert!(validate_region_code("M-H").is_err());
        assert!(validate_region_code("ABCDEFGHI").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::from_minor(-1)).is_err());

        assert!(validate_payment_amount(Money::from_minor(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
        assert!(validate_payment_amount(Money::from_minor(-100)).is_err());

        assert!(validate_initial_payment(Money::zero()).is_ok());
        assert!(validate_initial_payment(Money::from_minor(-1)).is_err());
    }

    #[test]
    fn test_amounts_are_capped() {
        let max = Money::from_minor(MAX_AMOUNT);
        let over = Money::from_minor(MAX_AMOUNT + 1);

        assert!(validate_price(max).is_ok());
        assert!(matches!(
            validate_price(Money::from_minor(10_i64.pow(18))),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_payment_amount(max).is_ok());
        assert!(validate_payment_amount(Money::from_minor(i64::MAX / 2 + 10)).is_err());
        assert!(validate_initial_payment(over).is_err());
    }

    #[test]
    fn test_validate_percentages() {
        assert!(validate_tax_rate_bps(1800).is_ok());
        assert!(validate_tax_rate_bps(10_001).is_err());
        assert!(validate_discount_percent(10_000).is_ok());
        assert!(validate_discount_percent(10_001).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(0).is_err());
        assert!(validate_line_count(MAX_ORDER_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_adjustment_delta() {
        assert!(validate_adjustment_delta(-3).is_ok());
        assert!(validate_adjustment_delta(0).is_err());
    }

    #[test]
    fn test_validate_note() {
        assert!(validate_note("note", None).is_ok());
        assert!(validate_note("note", Some("paid at counter")).is_ok());
        let long = "x".repeat(MAX_NOTE_LENGTH + 1);
        assert!(validate_note("note", Some(&long)).is_err());
    }
}
