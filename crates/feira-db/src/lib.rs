//! # feira-db: Database Layer for Feira POS
//!
//! This crate provides database access for the reconciliation & loyalty
//! ledger engine. It uses SQLite for local storage with sqlx for async
//! operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Feira POS Data Flow                              │
//! │                                                                         │
//! │  Engine operation (validate_batch)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     feira-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (batch.rs...) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ BatchRepo     │    │ 001_init.sql │  │   │
//! │  │   │ begin() tx    │◄───│ ProductRepo   │    │              │  │   │
//! │  │   │ WAL mode      │    │ CustomerRepo  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (or :memory: under test)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, customer, batch,
//!   points config, point ledger, admin)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use feira_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/feira.db")).await?;
//!
//! let pending = db
//!     .batches()
//!     .list(BatchStatus::Pending, &BatchFilter::default())
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::admin::AdminRepository;
pub use repository::batch::{BatchFilter, BatchRepository};
pub use repository::config::PointsConfigRepository;
pub use repository::customer::CustomerRepository;
pub use repository::ledger::PointLedgerRepository;
pub use repository::product::ProductRepository;
