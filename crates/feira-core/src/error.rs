//! # Error Types
//!
//! Domain-specific error types for feira-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  feira-core errors (this file)                                         │
//! │  ├── CoreError        - Capture-time and invariant failures            │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  feira-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  feira-engine errors (separate crate)                                  │
//! │  └── EngineError      - The full reconciliation taxonomy               │
//! │                         (Unauthorized, InvalidState, NotFound, ...)    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (customer id, product name, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations at the capture boundary
/// or invariant breaches detected by pure computations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A Points-tendered line would overdraw the customer's balance.
    ///
    /// Raised at item-capture time, never at validation time: once a line
    /// was appended with a stored point cost, validation debits that cost
    /// without re-checking affordability.
    #[error(
        "Customer {customer_id} cannot afford {required_points} points (balance {balance})"
    )]
    InsufficientPoints {
        customer_id: String,
        required_points: i64,
        balance: i64,
    },

    /// A computation would break a hard invariant (negative stock,
    /// mismatched subtotal, missing stored point cost).
    ///
    /// Always aborts the whole operation — nothing partially applied.
    #[error("Invariant violation: {detail}")]
    InvariantViolation { detail: String },

    /// Batch draft has exceeded the maximum number of lines.
    #[error("Batch cannot have more than {max} lines")]
    BatchTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvariantViolation for a would-be negative stock level.
    pub fn negative_stock(product: &str, available: i64, requested: i64) -> Self {
        CoreError::InvariantViolation {
            detail: format!(
                "stock for '{}' would go negative: available {}, requested {}",
                product, available, requested
            ),
        }
    }

    /// Creates an InvariantViolation with a free-form detail.
    pub fn invariant(detail: impl Into<String>) -> Self {
        CoreError::InvariantViolation {
            detail: detail.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when captured input doesn't meet requirements.
/// Used for early validation before business logic runs.
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

    /// Invalid format (e.g., malformed phone number, invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
