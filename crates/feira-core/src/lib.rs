//! # feira-core: Pure Business Logic for Feira POS
//!
//! This crate is the **heart** of the reconciliation & loyalty ledger
//! engine. It contains all business logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Feira POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Capture surface (UI/CLI, out of scope)             │   │
//! │  │    ring up lines ──► review check-marks ──► submit batch        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    feira-engine                                 │   │
//! │  │    Validate / Unvalidate / MarkDelivered / ListPending          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ feira-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  tender   │  │  loyalty  │  │   │
//! │  │   │  Batch    │  │   Money   │  │ aggregator│  │ point math│  │   │
//! │  │   │  Product  │  │ centavos  │  │  buckets  │  │  accrual  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐                                 │   │
//! │  │   │   draft   │  │ validation│                                 │   │
//! │  │   │  capture  │  │   rules   │                                 │   │
//! │  │   └───────────┘  └───────────┘                                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    feira-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Batch, BatchLine, Product, Customer, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`tender`] - Multi-tender aggregation (Points excluded from revenue)
//! - [`loyalty`] - Point accrual, redemption cost, affordability
//! - [`draft`] - Capture-time batch building and its gates
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in centavos (i64) to avoid float errors
//! 4. **Stored Deltas**: point costs and earns are fixed when applied and
//!    reversed from the stored figures, never recomputed
//!
//! ## Example Usage
//!
//! ```rust
//! use feira_core::money::Money;
//! use feira_core::loyalty::point_cost;
//! use feira_core::types::PointsConfig;
//!
//! // Create money from centavos (never from floats!)
//! let line_total = Money::from_cents(1500); // R$15,00
//!
//! // One point worth R$0,10 → the line costs 150 points
//! let config = PointsConfig::new(10);
//! assert_eq!(point_cost(line_total, &config).unwrap(), 150);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod draft;
pub mod error;
pub mod loyalty;
pub mod money;
pub mod tender;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use feira_core::Money` instead of
// `use feira_core::money::Money`

pub use draft::{BatchDraft, DraftLine, LineDraft};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use tender::{batch_totals, tender_totals, TenderTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single batch.
///
/// ## Business Reason
/// A volunteer's service shift never legitimately produces more; the cap
/// catches runaway capture loops before they hit the database.
pub const MAX_BATCH_LINES: usize = 200;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-capture (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum length for product and person names.
pub const MAX_NAME_LEN: usize = 200;
