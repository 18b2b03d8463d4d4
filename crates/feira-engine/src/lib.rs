//! # feira-engine: Reconciliation & Loyalty Ledger Engine
//!
//! The orchestration layer of Feira POS: takes volunteer-submitted batches,
//! applies authorized validation that mutates inventory and customer point
//! balances, supports exact reversal of that validation, and tracks partial
//! physical delivery of already-validated order items.
//!
//! ## The Hard Invariants
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  • Stock is never double-decremented and never goes negative           │
//! │  • Points are never double-awarded or double-spent                     │
//! │  • Unvalidate restores EXACTLY the deltas Validate applied, from       │
//! │    stored per-line figures — catalog/config edits in between cannot    │
//! │    skew the inverse                                                    │
//! │  • Every mutation is all-or-nothing: a failed Validate leaves the      │
//! │    batch exactly PENDING with zero side effects                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - The engine surface: submit, listings, review check-marks,
//!   delivery tracker, configuration, manual adjustments
//! - [`recon`] - The reconciliation state machine: Validate / Unvalidate
//! - [`auth`] - Credential hashing and actor resolution (argon2)
//! - [`error`] - The engine error taxonomy
//!
//! ## Example
//!
//! ```rust,ignore
//! use feira_db::{Database, DbConfig};
//! use feira_engine::ReconciliationEngine;
//!
//! let db = Database::new(DbConfig::new("./feira.db")).await?;
//! let engine = ReconciliationEngine::new(db);
//!
//! engine.register_admin("Padre João", "1234").await?;
//!
//! let batch_id = engine.submit_batch(draft).await?;
//! let batch = engine.validate_batch(&batch_id, "1234").await?;
//! assert_eq!(batch.validated_by.as_deref(), Some("Padre João"));
//!
//! // Exact inverse, confirmation gate is the caller's job
//! engine.unvalidate_batch(&batch_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod engine;
pub mod error;
pub mod recon;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::ReconciliationEngine;
pub use error::{EngineError, EngineResult};

// The listing filter is part of the engine's calling surface
pub use feira_db::BatchFilter;
