//! # Engine Error Type
//!
//! The full reconciliation error taxonomy, as callers see it.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Engine Error Kinds                                   │
//! │                                                                         │
//! │  Unauthorized        bad/unknown credential on Validate                │
//! │                      → recoverable, user re-enters credential          │
//! │                                                                         │
//! │  InvalidState        transition attempted from the wrong status        │
//! │                      → recoverable, surfaced as a no-op + explanation  │
//! │                                                                         │
//! │  InsufficientPoints  Points tender would overdraw, at capture time     │
//! │                      → recoverable, the line is simply not appended    │
//! │                                                                         │
//! │  NotFound            unknown product/customer/batch reference          │
//! │                      → customers recover via implicit creation;        │
//! │                        products and batches are fatal                  │
//! │                                                                         │
//! │  InvariantViolation  would cause negative stock / missing stored cost  │
//! │                      → aborts the ENTIRE atomic operation              │
//! │                                                                         │
//! │  All mutations are all-or-nothing: a failed Validate leaves the batch  │
//! │  exactly PENDING with zero side effects.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use feira_core::{BatchStatus, CoreError};
use feira_db::DbError;

/// Errors surfaced by the reconciliation engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Credential did not resolve to a known administrative actor.
    #[error("Unknown or incorrect credential")]
    Unauthorized,

    /// A lifecycle transition was attempted from the wrong status.
    #[error("Batch {batch_id} is {current_status:?}, cannot {operation}")]
    InvalidState {
        batch_id: String,
        current_status: BatchStatus,
        operation: String,
    },

    /// A Points-tendered line would overdraw the customer's balance
    /// (raised at capture time only).
    #[error("Customer {customer_id} cannot afford {required_points} points (balance {balance})")]
    InsufficientPoints {
        customer_id: String,
        required_points: i64,
        balance: i64,
    },

    /// Unknown batch/product/customer/item reference.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The operation would break a hard invariant; the whole atomic unit
    /// was rolled back.
    #[error("Invariant violation: {detail}")]
    InvariantViolation { detail: String },

    /// Malformed input (empty draft, bad phone, zero point value, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Infrastructure failure below the engine.
    #[error("Database error: {0}")]
    Database(DbError),
}

impl EngineError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidState error for a batch transition.
    pub fn invalid_state(
        batch_id: impl Into<String>,
        current_status: BatchStatus,
        operation: impl Into<String>,
    ) -> Self {
        EngineError::InvalidState {
            batch_id: batch_id.into(),
            current_status,
            operation: operation.into(),
        }
    }

    /// Creates an InvariantViolation with a free-form detail.
    pub fn invariant(detail: impl Into<String>) -> Self {
        EngineError::InvariantViolation {
            detail: detail.into(),
        }
    }
}

/// Converts database errors into the engine taxonomy.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            // The schema CHECK is the last line of defense; reaching it is an
            // invariant breach the guarded updates should have caught.
            DbError::CheckViolation { message } => EngineError::InvariantViolation {
                detail: message,
            },
            other => EngineError::Database(other),
        }
    }
}

/// Raw sqlx errors (transaction begin/commit) funnel through DbError so the
/// same mapping applies everywhere.
impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::from(DbError::from(err))
    }
}

/// Converts core (capture-time) errors into the engine taxonomy.
impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientPoints {
                customer_id,
                required_points,
                balance,
            } => EngineError::InsufficientPoints {
                customer_id,
                required_points,
                balance,
            },
            CoreError::InvariantViolation { detail } => {
                EngineError::InvariantViolation { detail }
            }
            other => EngineError::Validation(other.to_string()),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_not_found_maps_to_engine_not_found() {
        let err: EngineError = DbError::not_found("Batch", "b-1").into();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn test_core_insufficient_points_maps_through() {
        let err: EngineError = CoreError::InsufficientPoints {
            customer_id: "11987654321".to_string(),
            required_points: 150,
            balance: 40,
        }
        .into();
        assert!(matches!(err, EngineError::InsufficientPoints { .. }));
    }

    #[test]
    fn test_invalid_state_message() {
        let err = EngineError::invalid_state("b-1", BatchStatus::Validated, "validate");
        assert_eq!(
            err.to_string(),
            "Batch b-1 is Validated, cannot validate"
        );
    }
}
