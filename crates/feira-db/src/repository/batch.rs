//! # Batch Repository
//!
//! Database operations for batches and their line items.
//!
//! ## Batch Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Batch Lifecycle                                   │
//! │                                                                         │
//! │  1. SUBMIT                                                             │
//! │     └── insert() → Batch { status: Pending } + ordered items           │
//! │         (the line list is append/remove-free from here on)            │
//! │                                                                         │
//! │  2. REVIEW                                                             │
//! │     └── toggle_checked() per item — a review aid, nothing more         │
//! │                                                                         │
//! │  3. VALIDATE (feira-engine, one transaction)                           │
//! │     └── cas_status_tx(Pending → Validated) + stock/point postings      │
//! │         + freeze_totals_tx()                                           │
//! │                                                                         │
//! │  4. (OPTIONAL) REVERSE                                                 │
//! │     └── cas_status_tx(Validated → Pending) + exact inverse postings    │
//! │                                                                         │
//! │  5. (ORDERS) DELIVER                                                   │
//! │     └── set_delivered() per item, idempotent                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The CAS Status Flip
//! `UPDATE batches SET status = 'validated' WHERE id = ? AND status =
//! 'pending'` affecting zero rows means another actor got there first; the
//! engine maps that to `InvalidState` and rolls back. This is the per-batch
//! single-writer guarantee.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use feira_core::{
    Batch, BatchDetail, BatchKind, BatchLine, BatchStatus, Category, OrderContact,
    PendingDelivery, TenderMethod, TenderTotals,
};

// =============================================================================
// Row Types
// =============================================================================

/// Database row for a batch. Maps 1:1 onto [`feira_core::Batch`].
#[derive(Debug, Clone, sqlx::FromRow)]
struct BatchRow {
    id: String,
    kind: BatchKind,
    volunteer: String,
    service_label: String,
    submitted_at: DateTime<Utc>,
    status: BatchStatus,
    validated_by: Option<String>,
    notes: Option<String>,
    total_cash_cents: i64,
    total_pix_cents: i64,
    total_debit_cents: i64,
    total_credit_cents: i64,
    total_points_cents: i64,
    total_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            kind: row.kind,
            volunteer: row.volunteer,
            service_label: row.service_label,
            submitted_at: row.submitted_at,
            status: row.status,
            validated_by: row.validated_by,
            notes: row.notes,
            total_cash_cents: row.total_cash_cents,
            total_pix_cents: row.total_pix_cents,
            total_debit_cents: row.total_debit_cents,
            total_credit_cents: row.total_credit_cents,
            total_points_cents: row.total_points_cents,
            total_cents: row.total_cents,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for a batch item; the order contact is stored flattened.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ItemRow {
    id: String,
    batch_id: String,
    position: i64,
    product_name: String,
    category: Category,
    quantity: i64,
    unit_price_cents: i64,
    line_total_cents: i64,
    tender: TenderMethod,
    customer_id: Option<String>,
    checked: bool,
    point_cost: Option<i64>,
    points_earned: Option<i64>,
    delivered: bool,
    contact_name: Option<String>,
    contact_team: Option<String>,
    contact_phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ItemRow> for BatchLine {
    fn from(row: ItemRow) -> Self {
        let contact = row.contact_name.map(|name| OrderContact {
            name,
            team: row.contact_team,
            phone: row.contact_phone,
        });
        BatchLine {
            id: row.id,
            batch_id: row.batch_id,
            position: row.position,
            product_name: row.product_name,
            category: row.category,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            line_total_cents: row.line_total_cents,
            tender: row.tender,
            customer_id: row.customer_id,
            checked: row.checked,
            point_cost: row.point_cost,
            points_earned: row.points_earned,
            delivered: row.delivered,
            contact,
            created_at: row.created_at,
        }
    }
}

/// Database row for the pending-deliveries feed (join of batch + item).
#[derive(Debug, Clone, sqlx::FromRow)]
struct PendingDeliveryRow {
    batch_id: String,
    volunteer: String,
    service_label: String,
    submitted_at: DateTime<Utc>,
    position: i64,
    product_name: String,
    quantity: i64,
    contact_name: Option<String>,
    contact_team: Option<String>,
    contact_phone: Option<String>,
}

impl From<PendingDeliveryRow> for PendingDelivery {
    fn from(row: PendingDeliveryRow) -> Self {
        let contact = row.contact_name.map(|name| OrderContact {
            name,
            team: row.contact_team,
            phone: row.contact_phone,
        });
        PendingDelivery {
            batch_id: row.batch_id,
            volunteer: row.volunteer,
            service_label: row.service_label,
            submitted_at: row.submitted_at,
            position: row.position,
            product_name: row.product_name,
            quantity: row.quantity,
            contact,
        }
    }
}

const BATCH_COLUMNS: &str = "id, kind, volunteer, service_label, submitted_at, status, \
     validated_by, notes, total_cash_cents, total_pix_cents, total_debit_cents, \
     total_credit_cents, total_points_cents, total_cents, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, batch_id, position, product_name, category, quantity, \
     unit_price_cents, line_total_cents, tender, customer_id, checked, point_cost, \
     points_earned, delivered, contact_name, contact_team, contact_phone, created_at";

// =============================================================================
// Listing Filter
// =============================================================================

/// Optional listing filters: by volunteer, service context, batch kind.
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub volunteer: Option<String>,
    pub service_label: Option<String>,
    pub kind: Option<BatchKind>,
}

impl BatchFilter {
    /// Filter by submitting volunteer.
    pub fn volunteer(mut self, volunteer: impl Into<String>) -> Self {
        self.volunteer = Some(volunteer.into());
        self
    }

    /// Filter by service/event context label.
    pub fn service_label(mut self, label: impl Into<String>) -> Self {
        self.service_label = Some(label.into());
        self
    }

    /// Filter by batch kind.
    pub fn kind(mut self, kind: BatchKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for batch database operations.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Inserts a submitted batch with its ordered items, atomically.
    ///
    /// After this point the line list is append/remove-free — the only way
    /// its effects change is through Validate/Unvalidate.
    pub async fn insert(&self, batch: &Batch, items: &[BatchLine]) -> DbResult<()> {
        debug!(id = %batch.id, items = items.len(), "Inserting batch");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO batches (
                id, kind, volunteer, service_label, submitted_at, status,
                validated_by, notes,
                total_cash_cents, total_pix_cents, total_debit_cents,
                total_credit_cents, total_points_cents, total_cents,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&batch.id)
        .bind(batch.kind)
        .bind(&batch.volunteer)
        .bind(&batch.service_label)
        .bind(batch.submitted_at)
        .bind(batch.status)
        .bind(&batch.validated_by)
        .bind(&batch.notes)
        .bind(batch.total_cash_cents)
        .bind(batch.total_pix_cents)
        .bind(batch.total_debit_cents)
        .bind(batch.total_credit_cents)
        .bind(batch.total_points_cents)
        .bind(batch.total_cents)
        .bind(batch.created_at)
        .bind(batch.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            let (contact_name, contact_team, contact_phone) = match &item.contact {
                Some(c) => (Some(&c.name), c.team.as_ref(), c.phone.as_ref()),
                None => (None, None, None),
            };

            sqlx::query(
                r#"
                INSERT INTO batch_items (
                    id, batch_id, position, product_name, category, quantity,
                    unit_price_cents, line_total_cents, tender, customer_id,
                    checked, point_cost, points_earned, delivered,
                    contact_name, contact_team, contact_phone, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&item.id)
            .bind(&item.batch_id)
            .bind(item.position)
            .bind(&item.product_name)
            .bind(item.category)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.line_total_cents)
            .bind(item.tender)
            .bind(&item.customer_id)
            .bind(item.checked)
            .bind(item.point_cost)
            .bind(item.points_earned)
            .bind(item.delivered)
            .bind(contact_name)
            .bind(contact_team)
            .bind(contact_phone)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a batch by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Batch>> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Batch::from))
    }

    /// Gets all items for a batch, in capture order.
    pub async fn get_items(&self, batch_id: &str) -> DbResult<Vec<BatchLine>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM batch_items WHERE batch_id = ? ORDER BY position"
        ))
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BatchLine::from).collect())
    }

    /// Gets a batch together with its items.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<BatchDetail>> {
        let Some(batch) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.get_items(id).await?;
        Ok(Some(BatchDetail { batch, items }))
    }

    /// Lists batches by status, newest first, with optional filters.
    pub async fn list(&self, status: BatchStatus, filter: &BatchFilter) -> DbResult<Vec<Batch>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE status = "
        ));
        qb.push_bind(status);

        if let Some(volunteer) = &filter.volunteer {
            qb.push(" AND volunteer = ");
            qb.push_bind(volunteer);
        }
        if let Some(label) = &filter.service_label {
            qb.push(" AND service_label = ");
            qb.push_bind(label);
        }
        if let Some(kind) = filter.kind {
            qb.push(" AND kind = ");
            qb.push_bind(kind);
        }

        qb.push(" ORDER BY submitted_at DESC");

        let rows = qb
            .build_query_as::<BatchRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Batch::from).collect())
    }

    /// Toggles an item's review check-mark. Returns the new state.
    ///
    /// A review aid only: never gates validation, never touches stock or
    /// points.
    pub async fn toggle_checked(&self, batch_id: &str, position: i64) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE batch_items SET checked = 1 - checked WHERE batch_id = ? AND position = ?",
        )
        .bind(batch_id)
        .bind(position)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(
                "Batch item",
                format!("{batch_id}#{position}"),
            ));
        }

        let checked: bool = sqlx::query_scalar(
            "SELECT checked FROM batch_items WHERE batch_id = ? AND position = ?",
        )
        .bind(batch_id)
        .bind(position)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(checked)
    }

    /// Marks an item delivered. Idempotent: already-delivered items stay
    /// delivered and the call still succeeds.
    pub async fn set_delivered(&self, batch_id: &str, position: i64) -> DbResult<()> {
        debug!(batch = %batch_id, position = %position, "Marking item delivered");

        let result = sqlx::query(
            "UPDATE batch_items SET delivered = 1 WHERE batch_id = ? AND position = ?",
        )
        .bind(batch_id)
        .bind(position)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(
                "Batch item",
                format!("{batch_id}#{position}"),
            ));
        }

        Ok(())
    }

    /// The pending-deliveries feed: every undelivered line across all
    /// validated order batches, annotated with parent batch context.
    pub async fn pending_deliveries(&self) -> DbResult<Vec<PendingDelivery>> {
        let rows = sqlx::query_as::<_, PendingDeliveryRow>(
            r#"
            SELECT
                b.id AS batch_id,
                b.volunteer,
                b.service_label,
                b.submitted_at,
                i.position,
                i.product_name,
                i.quantity,
                i.contact_name,
                i.contact_team,
                i.contact_phone
            FROM batch_items i
            INNER JOIN batches b ON b.id = i.batch_id
            WHERE b.kind = 'order'
              AND b.status = 'validated'
              AND i.delivered = 0
            ORDER BY b.submitted_at, i.position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PendingDelivery::from).collect())
    }

    // =========================================================================
    // Transaction-scoped operations (composed by the engine)
    // =========================================================================

    /// Reads a batch inside a transaction.
    pub async fn get_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Batch>> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(Batch::from))
    }

    /// Reads a batch's items inside a transaction, in capture order.
    pub async fn items_tx(conn: &mut SqliteConnection, batch_id: &str) -> DbResult<Vec<BatchLine>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM batch_items WHERE batch_id = ? ORDER BY position"
        ))
        .bind(batch_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(BatchLine::from).collect())
    }

    /// Compare-and-swap status flip inside a transaction.
    ///
    /// Returns the number of rows affected: 0 means the batch was not in
    /// `from` status any more — the engine maps that to `InvalidState`.
    pub async fn cas_status_tx(
        conn: &mut SqliteConnection,
        id: &str,
        from: BatchStatus,
        to: BatchStatus,
        validated_by: Option<&str>,
    ) -> DbResult<u64> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE batches
            SET status = ?, validated_by = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(to)
        .bind(validated_by)
        .bind(now)
        .bind(id)
        .bind(from)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Freezes the recomputed tender subtotals onto the batch row.
    pub async fn freeze_totals_tx(
        conn: &mut SqliteConnection,
        id: &str,
        totals: &TenderTotals,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE batches SET
                total_cash_cents = ?,
                total_pix_cents = ?,
                total_debit_cents = ?,
                total_credit_cents = ?,
                total_points_cents = ?,
                total_cents = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(totals.cash_cents)
        .bind(totals.pix_cents)
        .bind(totals.debit_cents)
        .bind(totals.credit_cents)
        .bind(totals.points_cents)
        .bind(totals.total_cents)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", id));
        }

        Ok(())
    }

    /// Stores (or clears) the points credited to a line at validation time.
    pub async fn set_points_earned_tx(
        conn: &mut SqliteConnection,
        item_id: &str,
        earned: Option<i64>,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE batch_items SET points_earned = ? WHERE id = ?")
            .bind(earned)
            .bind(item_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch item", item_id));
        }

        Ok(())
    }
}

/// Helper to generate a new batch ID.
pub fn generate_batch_id() -> String {
    Uuid::new_v4().to_string()
}

/// Helper to generate a new batch item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
