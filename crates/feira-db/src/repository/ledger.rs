//! # Point Ledger Repository
//!
//! Append-only audit trail of every point-affecting operation.
//!
//! ## Why a Ledger?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Ledger Append Pattern                               │
//! │                                                                         │
//! │  VALIDATE (single transaction)                                         │
//! │    1. UPDATE customers SET points = points + 5 ...                     │
//! │    2. INSERT INTO point_ledger ('earn', +5, batch_id)                  │
//! │                                                                         │
//! │  COMMIT ← balance change and audit row succeed or fail together        │
//! │                                                                         │
//! │  The balance answers "how many points now?"; the ledger answers        │
//! │  "where did every point come from?" — and a reversal row never         │
//! │  deletes history, it appends the inverse.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use feira_core::{LedgerKind, PointLedgerEntry};

/// Database row for a ledger entry. Maps 1:1 onto
/// [`feira_core::PointLedgerEntry`].
#[derive(Debug, Clone, sqlx::FromRow)]
struct LedgerRow {
    id: String,
    customer_id: String,
    batch_id: Option<String>,
    kind: LedgerKind,
    points_delta: i64,
    reason: Option<String>,
    created_at: chrono::DateTime<Utc>,
}

impl From<LedgerRow> for PointLedgerEntry {
    fn from(row: LedgerRow) -> Self {
        PointLedgerEntry {
            id: row.id,
            customer_id: row.customer_id,
            batch_id: row.batch_id,
            kind: row.kind,
            points_delta: row.points_delta,
            reason: row.reason,
            created_at: row.created_at,
        }
    }
}

/// Repository for point ledger operations.
#[derive(Debug, Clone)]
pub struct PointLedgerRepository {
    pool: SqlitePool,
}

impl PointLedgerRepository {
    /// Creates a new PointLedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PointLedgerRepository { pool }
    }

    /// Lists a customer's ledger entries, newest first.
    pub async fn list_for_customer(
        &self,
        customer_id: &str,
        limit: u32,
    ) -> DbResult<Vec<PointLedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT id, customer_id, batch_id, kind, points_delta, reason, created_at
            FROM point_ledger
            WHERE customer_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PointLedgerEntry::from).collect())
    }

    /// Lists all entries posted by a batch (validation or reversal audit).
    pub async fn list_for_batch(&self, batch_id: &str) -> DbResult<Vec<PointLedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT id, customer_id, batch_id, kind, points_delta, reason, created_at
            FROM point_ledger
            WHERE batch_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PointLedgerEntry::from).collect())
    }

    // =========================================================================
    // Transaction-scoped operations (composed by the engine)
    // =========================================================================

    /// Appends one audit row inside a transaction.
    pub async fn append_tx(
        conn: &mut SqliteConnection,
        customer_id: &str,
        batch_id: Option<&str>,
        kind: LedgerKind,
        points_delta: i64,
        reason: Option<&str>,
    ) -> DbResult<PointLedgerEntry> {
        let entry = PointLedgerEntry {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            batch_id: batch_id.map(str::to_string),
            kind,
            points_delta,
            reason: reason.map(str::to_string),
            created_at: Utc::now(),
        };

        debug!(
            customer = %entry.customer_id,
            kind = ?entry.kind,
            delta = entry.points_delta,
            "Appending ledger entry"
        );

        sqlx::query(
            r#"
            INSERT INTO point_ledger (
                id, customer_id, batch_id, kind, points_delta, reason, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.customer_id)
        .bind(&entry.batch_id)
        .bind(entry.kind)
        .bind(entry.points_delta)
        .bind(&entry.reason)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(entry)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_append_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.customers().get_or_create("11987654321", "Maria").await.unwrap();

        let mut tx = db.begin().await.unwrap();
        PointLedgerRepository::append_tx(
            &mut tx,
            "11987654321",
            Some("batch-1"),
            LedgerKind::Earn,
            5,
            Some("Pastel"),
        )
        .await
        .unwrap();
        PointLedgerRepository::append_tx(
            &mut tx,
            "11987654321",
            None,
            LedgerKind::Adjustment,
            -3,
            Some("zeroing error"),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let entries = db
            .point_ledger()
            .list_for_customer("11987654321", 10)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);

        let batch_entries = db.point_ledger().list_for_batch("batch-1").await.unwrap();
        assert_eq!(batch_entries.len(), 1);
        assert_eq!(batch_entries[0].kind, LedgerKind::Earn);
        assert_eq!(batch_entries[0].points_delta, 5);
    }

    #[tokio::test]
    async fn test_append_requires_known_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let err = PointLedgerRepository::append_tx(
            &mut tx,
            "00000000",
            None,
            LedgerKind::Adjustment,
            1,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, crate::error::DbError::ForeignKeyViolation { .. }));
    }
}
