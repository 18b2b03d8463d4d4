//! # Validation Module
//!
//! Input validation utilities for Feira POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Capture surface (UI/CLI, out of scope)                       │
//! │  ├── Basic format checks, immediate volunteer feedback                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + draft rules                                    │
//! │  ├── Phone normalization, quantity/price bounds                        │
//! │  └── Business gates (InsufficientPoints) live in draft.rs              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE constraints                                     │
//! │  └── CHECK (stock >= 0) as a last line of defense                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_LINE_QUANTITY, MAX_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Phone Normalization
// =============================================================================

/// Normalizes a phone number to canonical digits — the deterministic
/// customer id.
///
/// ## Rules
/// - Strips every non-digit character
/// - Must leave 8 to 13 digits (local number up to country-prefixed mobile)
///
/// ## Example
/// ```rust
/// use feira_core::validation::normalize_phone;
///
/// assert_eq!(normalize_phone("(11) 98765-4321").unwrap(), "11987654321");
/// assert_eq!(normalize_phone("+55 11 98765-4321").unwrap(), "5511987654321");
/// assert!(normalize_phone("not a phone").is_err());
/// ```
///
/// ## Deterministic Ids
/// The same phone number, however formatted at capture, always resolves to
/// the same customer record. This is what makes implicit customer creation
/// an upsert rather than a duplicate factory.
pub fn normalize_phone(raw: &str) -> ValidationResult<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    if digits.len() < 8 || digits.len() > 13 {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain 8 to 13 digits".to_string(),
        });
    }

    Ok(digits)
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name snapshot.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "product name".to_string(),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "product name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a volunteer or actor display name.
pub fn validate_person_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in centavos.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (donated/free items)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates the monetary worth of one point.
///
/// Zero or negative would make every redemption free or undefined.
pub fn validate_point_value(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "point value".to_string(),
        });
    }

    Ok(())
}

/// Validates a per-category accrual rate.
pub fn validate_accrual_rate(points: i64) -> ValidationResult<()> {
    if points < 0 {
        return Err(ValidationError::OutOfRange {
            field: "accrual rate".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a batch/product/ledger id string format.
///
/// ## Example
/// ```rust
/// use feira_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(11) 98765-4321").unwrap(), "11987654321");
        assert_eq!(
            normalize_phone("+55 11 98765-4321").unwrap(),
            "5511987654321"
        );
        assert_eq!(normalize_phone("34567890").unwrap(), "34567890");

        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("abc").is_err());
        assert!(normalize_phone("1234567").is_err()); // too short
        assert!(normalize_phone("12345678901234").is_err()); // too long
    }

    #[test]
    fn test_normalize_phone_is_deterministic() {
        let a = normalize_phone("(11) 98765-4321").unwrap();
        let b = normalize_phone("11 98765 4321").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_point_value() {
        assert!(validate_point_value(10).is_ok());
        assert!(validate_point_value(0).is_err());
        assert!(validate_point_value(-5).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Pastel de Queijo").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
