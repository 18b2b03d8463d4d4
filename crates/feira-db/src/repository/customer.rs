//! # Customer Repository
//!
//! Database operations for loyalty customers.
//!
//! ## Implicit Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Upsert-on-Lookup                                        │
//! │                                                                         │
//! │  Volunteer types "(11) 98765-4321"                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  normalize_phone → "11987654321"  (deterministic id)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  get_or_create("11987654321", "Maria")                                 │
//! │       │                                                                 │
//! │       ├── row exists?  return it (name untouched)                      │
//! │       └── no row?      INSERT with zero balance, return it             │
//! │                                                                         │
//! │  The upsert is explicit — never a side effect hidden inside a getter.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Point Deltas
//! Balance mutations are always relative (`points = points + ?`) so that
//! concurrent validations of different batches touching the same customer
//! serialize at the storage layer without lost updates.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use feira_core::Customer;

/// Database row for a customer. Maps 1:1 onto [`feira_core::Customer`].
#[derive(Debug, Clone, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    points: i64,
    total_spent_cents: i64,
    last_purchase_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            points: row.points,
            total_spent_cents: row.total_spent_cents,
            last_purchase_at: row.last_purchase_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, name, points, total_spent_cents, last_purchase_at, created_at, updated_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by canonical phone digits.
    pub async fn get(&self, id: &str) -> DbResult<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM customers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    /// Gets an existing customer or creates one with a zero balance.
    ///
    /// The id must already be canonical phone digits
    /// (see `feira_core::validation::normalize_phone`).
    pub async fn get_or_create(&self, id: &str, name: &str) -> DbResult<Customer> {
        let mut conn = self.pool.acquire().await?;
        Self::get_or_create_tx(&mut conn, id, name).await
    }

    /// Lists all customers ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM customers ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    /// Counts customers (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Transaction-scoped operations (composed by the engine)
    // =========================================================================

    /// Upsert-on-lookup inside a transaction.
    pub async fn get_or_create_tx(
        conn: &mut SqliteConnection,
        id: &str,
        name: &str,
    ) -> DbResult<Customer> {
        let now = Utc::now();

        // INSERT OR IGNORE keeps the first-seen name; later captures with a
        // different spelling do not rename the customer.
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO customers (
                id, name, points, total_spent_cents, last_purchase_at,
                created_at, updated_at
            ) VALUES (?, ?, 0, 0, NULL, ?, ?)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM customers WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(Customer::from(row))
    }

    /// Applies a relative point delta and returns the new balance.
    ///
    /// The balance may go transiently negative; corrections happen through
    /// manual adjustments, not by refusing the posting.
    pub async fn adjust_points_tx(
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
    ) -> DbResult<i64> {
        debug!(customer = %id, delta = %delta, "Adjusting points");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE customers SET points = points + ?, updated_at = ? WHERE id = ?",
        )
        .bind(delta)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        let balance: i64 = sqlx::query_scalar("SELECT points FROM customers WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(balance)
    }

    /// Accumulates validated spend and stamps the purchase timestamp.
    pub async fn record_purchase_tx(
        conn: &mut SqliteConnection,
        id: &str,
        spent_cents: i64,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET total_spent_cents = total_spent_cents + ?,
                last_purchase_at = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(spent_cents)
        .bind(at)
        .bind(at)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Rolls back accumulated spend (reversal path).
    ///
    /// `last_purchase_at` is left untouched: it is a display hint, not part
    /// of the reversible delta set.
    pub async fn rollback_purchase_tx(
        conn: &mut SqliteConnection,
        id: &str,
        spent_cents: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE customers
            SET total_spent_cents = total_spent_cents - ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(spent_cents)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
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
    async fn test_get_or_create_is_deterministic() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        let first = repo.get_or_create("11987654321", "Maria").await.unwrap();
        assert_eq!(first.points, 0);

        // Second lookup with a different spelling keeps the original record
        let second = repo.get_or_create("11987654321", "M. Silva").await.unwrap();
        assert_eq!(second.name, "Maria");
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_adjust_points_is_relative() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();
        repo.get_or_create("11987654321", "Maria").await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let balance = CustomerRepository::adjust_points_tx(&mut tx, "11987654321", 5)
            .await
            .unwrap();
        assert_eq!(balance, 5);

        let balance = CustomerRepository::adjust_points_tx(&mut tx, "11987654321", -8)
            .await
            .unwrap();
        // Transiently negative is allowed
        assert_eq!(balance, -3);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_adjust_points_unknown_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let err = CustomerRepository::adjust_points_tx(&mut tx, "000000000", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_purchase_accumulator_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();
        repo.get_or_create("11987654321", "Maria").await.unwrap();

        let mut tx = db.begin().await.unwrap();
        CustomerRepository::record_purchase_tx(&mut tx, "11987654321", 1600, Utc::now())
            .await
            .unwrap();
        CustomerRepository::rollback_purchase_tx(&mut tx, "11987654321", 1600)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let customer = repo.get("11987654321").await.unwrap().unwrap();
        assert_eq!(customer.total_spent_cents, 0);
        // The timestamp is a display hint and survives reversal
        assert!(customer.last_purchase_at.is_some());
    }
}
