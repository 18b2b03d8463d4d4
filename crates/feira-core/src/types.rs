//! # Domain Types
//!
//! Core domain types used throughout Feira POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │     Batch       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (phone)     │   │  id (UUID)      │       │
//! │  │  name (unique)  │   │  points         │   │  kind, status   │       │
//! │  │  price_cents    │   │  total_spent    │   │  frozen totals  │       │
//! │  │  stock, category│   │  last_purchase  │   │  validated_by   │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                       │                 │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌────────┴────────┐       │
//! │  │  TenderMethod   │   │   BatchStatus   │   │   BatchLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Cash, Pix      │   │  Pending        │   │  name snapshot  │       │
//! │  │  Debit          │   │  Validated      │   │  price snapshot │       │
//! │  │  Credit1x..3x   │   └─────────────────┘   │  point_cost     │       │
//! │  │  Points         │                         │  points_earned  │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `BatchLine` denormalizes the product name, category and unit price at
//! capture time. Historical batches stay accurate after catalog edits, and
//! reversal works from the stored per-line deltas, never from current
//! catalog or configuration state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::money::Money;

// =============================================================================
// Category
// =============================================================================

/// Product category. Loyalty accrual rates are keyed by category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Prepared food (pastel, cachorro-quente, ...).
    Food,
    /// Bottled and fountain drinks.
    Drink,
    /// Sweets and desserts.
    Sweet,
    /// Bazaar goods (crafts, clothing, donations resold).
    Bazaar,
    /// Anything that doesn't fit the fixed set.
    Other,
}

impl Category {
    /// All categories, in display order. Used to build rate tables.
    pub const ALL: [Category; 5] = [
        Category::Food,
        Category::Drink,
        Category::Sweet,
        Category::Bazaar,
        Category::Other,
    ];
}

// =============================================================================
// Tender Method
// =============================================================================

/// The payment method of a single line item.
///
/// ## Closed Enumeration
/// Installment counts are distinct methods at capture time (the volunteer
/// records what the customer chose) but collapse into one Credit bucket for
/// financial subtotals — see [`TenderMethod::bucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
pub enum TenderMethod {
    /// Physical cash.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "cash"))]
    Cash,
    /// Pix instant transfer.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "pix"))]
    Pix,
    /// Debit card.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "debit"))]
    Debit,
    /// Credit card, single installment.
    #[serde(rename = "credit_1x")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "credit_1x"))]
    Credit1x,
    /// Credit card, two installments.
    #[serde(rename = "credit_2x")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "credit_2x"))]
    Credit2x,
    /// Credit card, three installments.
    #[serde(rename = "credit_3x")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "credit_3x"))]
    Credit3x,
    /// Redemption of previously-earned loyalty points.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "points"))]
    Points,
}

/// Five-way financial bucket a tender method falls into.
///
/// Points is a bucket of its own: a Points-tendered line spends
/// already-earned value and must never inflate recognized revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenderBucket {
    Cash,
    Pix,
    Debit,
    Credit,
    Points,
}

impl TenderMethod {
    /// Collapses installment variants into their financial bucket.
    pub const fn bucket(&self) -> TenderBucket {
        match self {
            TenderMethod::Cash => TenderBucket::Cash,
            TenderMethod::Pix => TenderBucket::Pix,
            TenderMethod::Debit => TenderBucket::Debit,
            TenderMethod::Credit1x | TenderMethod::Credit2x | TenderMethod::Credit3x => {
                TenderBucket::Credit
            }
            TenderMethod::Points => TenderBucket::Points,
        }
    }

    /// Whether this tender is a loyalty point redemption.
    #[inline]
    pub const fn is_points(&self) -> bool {
        matches!(self, TenderMethod::Points)
    }

    /// Whether this tender contributes new revenue to the grand total.
    #[inline]
    pub const fn is_monetary(&self) -> bool {
        !self.is_points()
    }
}

// =============================================================================
// Batch Status & Kind
// =============================================================================

/// Lifecycle status of a batch.
///
/// `Validated` is terminal in the business sense but reversible:
/// `Validated → Pending` is a supported transition, not an error path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Submitted, awaiting authorized validation.
    Pending,
    /// Validated: stock, points and revenue effects have been applied.
    Validated,
}

impl Default for BatchStatus {
    fn default() -> Self {
        BatchStatus::Pending
    }
}

/// What kind of batch a volunteer submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    /// Sales report: items sold and handed over on the spot.
    Sales,
    /// Order sheet: items to be delivered later, tracked per line.
    Order,
}

// =============================================================================
// Product
// =============================================================================

/// A product in the externally-owned catalog.
///
/// The engine reads products and mutates `stock` only; price/cost/name edits
/// belong to the catalog owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name. Unique — batch lines match stock by name snapshot.
    pub name: String,

    /// Category, drives the loyalty accrual rate.
    pub category: Category,

    /// Price in centavos (smallest currency unit).
    pub price_cents: i64,

    /// Cost in centavos (for margin reporting).
    pub cost_cents: i64,

    /// Current stock level. Never goes negative through engine operations.
    pub stock: i64,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether current stock covers a requested quantity.
    #[inline]
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A loyalty customer, keyed by canonical phone digits.
///
/// Created implicitly on first identified purchase
/// (upsert-on-lookup, see the customer repository).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Canonical phone digits — the deterministic id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Point balance. Nominally ≥ 0; may be transiently negative and is
    /// corrected through manual adjustments.
    pub points: i64,

    /// Lifetime monetary spend accumulator, in centavos.
    pub total_spent_cents: i64,

    /// Timestamp of the most recent validated purchase.
    pub last_purchase_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Lifetime spend as Money.
    #[inline]
    pub fn total_spent(&self) -> Money {
        Money::from_cents(self.total_spent_cents)
    }
}

// =============================================================================
// Batch Line
// =============================================================================

/// Denormalized customer contact carried by order-sheet lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderContact {
    pub name: String,
    pub team: Option<String>,
    pub phone: Option<String>,
}

/// A line item in a batch.
///
/// Uses the snapshot pattern to freeze product data at capture time. The
/// stored `point_cost` (fixed at capture) and `points_earned` (fixed at
/// validation) are the per-line loyalty deltas that make reversal exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchLine {
    pub id: String,
    pub batch_id: String,

    /// Position within the batch (0-based, stable ordering).
    pub position: i64,

    /// Product name at capture time (frozen).
    pub product_name: String,

    /// Product category at capture time (frozen).
    pub category: Category,

    /// Quantity sold or ordered.
    pub quantity: i64,

    /// Unit price in centavos at capture time (frozen).
    pub unit_price_cents: i64,

    /// Line total (unit_price × quantity) at capture time.
    pub line_total_cents: i64,

    /// How the line was paid.
    pub tender: TenderMethod,

    /// Linked loyalty customer (canonical phone digits), if identified.
    pub customer_id: Option<String>,

    /// Review check-mark. A review aid only — never gates validation.
    pub checked: bool,

    /// Point cost fixed at capture time for Points-tendered lines.
    /// Immutable historical fact; validation debits exactly this amount.
    pub point_cost: Option<i64>,

    /// Points credited at validation time. `None` until validated; cleared
    /// again by reversal.
    pub points_earned: Option<i64>,

    /// Physical hand-off flag. Order batches only; meaningful once the
    /// parent batch is validated.
    pub delivered: bool,

    /// Denormalized contact. Order batches only.
    pub contact: Option<OrderContact>,

    pub created_at: DateTime<Utc>,
}

impl BatchLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Batch
// =============================================================================

/// A volunteer-submitted collection of line items — the unit of atomic
/// validation and reversal.
///
/// ## Lifecycle
/// ```text
/// submit ──► PENDING ──(Validate, authorized)──► VALIDATED
///                ▲                                   │
///                └──────────(Unvalidate)─────────────┘
/// ```
///
/// The four-way subtotals plus grand total are derived from the lines by the
/// tender aggregator and frozen at validation time; they are never
/// independently settable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub kind: BatchKind,

    /// Volunteer who captured and submitted the batch.
    pub volunteer: String,

    /// Service/event context label (e.g. "Festa Junina 2026 - Saturday").
    pub service_label: String,

    pub submitted_at: DateTime<Utc>,
    pub status: BatchStatus,

    /// Display name of the validating actor. Audit display only — never the
    /// credential itself.
    pub validated_by: Option<String>,

    /// Free-text notes. Sales reports only.
    pub notes: Option<String>,

    pub total_cash_cents: i64,
    pub total_pix_cents: i64,
    pub total_debit_cents: i64,
    pub total_credit_cents: i64,

    /// Monetary value redeemed via points. Tracked for display; excluded
    /// from the grand total.
    pub total_points_cents: i64,

    /// Grand total: cash + pix + debit + credit. Points excluded.
    pub total_cents: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A batch together with its ordered lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDetail {
    pub batch: Batch,
    pub items: Vec<BatchLine>,
}

/// One undelivered order line, annotated with its parent batch context.
///
/// The feed an external notification collaborator consumes to alert
/// customers. Produced only from validated order batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDelivery {
    pub batch_id: String,
    pub volunteer: String,
    pub service_label: String,
    pub submitted_at: DateTime<Utc>,

    /// Position of the line within its batch.
    pub position: i64,

    pub product_name: String,
    pub quantity: i64,
    pub contact: Option<OrderContact>,
}

// =============================================================================
// Points Configuration
// =============================================================================

/// Loyalty configuration: per-category accrual rates plus the monetary worth
/// of one point.
///
/// ## Consistency Rule
/// Mutated only through an explicit administrative update; takes effect on
/// subsequent validations and never recomputes past ledger entries.
/// Validation reads one snapshot of this struct for the whole operation —
/// it is passed explicitly into the call, never read mid-flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsConfig {
    /// Monetary worth of one point, in centavos. Must be positive.
    pub point_value_cents: i64,

    /// Points earned per validated line, keyed by category.
    /// Missing categories earn nothing.
    pub rates: BTreeMap<Category, i64>,
}

impl PointsConfig {
    /// Creates a configuration with the given point value and no rates.
    pub fn new(point_value_cents: i64) -> Self {
        PointsConfig {
            point_value_cents,
            rates: BTreeMap::new(),
        }
    }

    /// Sets the accrual rate for a category (builder style).
    pub fn with_rate(mut self, category: Category, points_per_line: i64) -> Self {
        self.rates.insert(category, points_per_line);
        self
    }

    /// Accrual rate for a category; categories without a rate earn 0.
    #[inline]
    pub fn rate(&self, category: Category) -> i64 {
        self.rates.get(&category).copied().unwrap_or(0)
    }

    /// Monetary worth of one point.
    #[inline]
    pub fn point_value(&self) -> Money {
        Money::from_cents(self.point_value_cents)
    }
}

impl Default for PointsConfig {
    /// One point worth R$0,10, no accrual rates configured.
    fn default() -> Self {
        PointsConfig::new(10)
    }
}

// =============================================================================
// Point Ledger
// =============================================================================

/// What kind of event a point ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// Accrual posted by batch validation.
    Earn,
    /// Redemption debited by batch validation.
    Redeem,
    /// Inverse posting from batch reversal.
    Reversal,
    /// Manual administrative correction, outside any batch.
    Adjustment,
}

/// An append-only audit record of a point-affecting operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointLedgerEntry {
    pub id: String,
    pub customer_id: String,

    /// The batch that caused the posting. `None` for manual adjustments.
    pub batch_id: Option<String>,

    pub kind: LedgerKind,

    /// Signed point delta applied to the customer balance.
    pub points_delta: i64,

    /// Human context (product name, correction reason).
    pub reason: Option<String>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Administrator
// =============================================================================

/// An administrative actor allowed to validate batches.
///
/// The credential itself is never stored — only an argon2 hash. The display
/// name is what gets recorded on validated batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
