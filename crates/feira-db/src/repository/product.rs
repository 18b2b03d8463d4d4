//! # Product Repository
//!
//! Database operations for the externally-owned product catalog.
//!
//! ## Stock Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: Absolute update (races lose decrements)                     │
//! │     UPDATE products SET stock = 7 WHERE name = ?                       │
//! │                                                                         │
//! │  ✅ CORRECT: Guarded delta update                                      │
//! │     UPDATE products SET stock = stock - ?                              │
//! │     WHERE name = ? AND stock >= ?                                      │
//! │                                                                         │
//! │  Two batches validated concurrently that touch the same product        │
//! │  both apply their deltas; the guard turns a would-be negative stock    │
//! │  into zero rows affected, which the engine maps to an invariant        │
//! │  violation and a full rollback.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use feira_core::{Category, Product};

/// Database row for a product. Maps 1:1 onto [`feira_core::Product`].
#[derive(Debug, Clone, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    category: Category,
    price_cents: i64,
    cost_cents: i64,
    stock: i64,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            category: row.category,
            price_cents: row.price_cents,
            cost_cents: row.cost_cents,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, name, category, price_cents, cost_cents, stock, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Gets a product by its unique name.
    ///
    /// Batch lines match stock by name snapshot, so this is the lookup the
    /// engine uses.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM products WHERE name = ?"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Lists all products ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM products ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - name already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, price_cents, cost_cents, stock,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.category)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Updates an existing product (catalog edits: name, price, cost,
    /// category, stock corrections).
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?,
                category = ?,
                price_cents = ?,
                cost_cents = ?,
                stock = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&product.name)
        .bind(product.category)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(now)
        .bind(&product.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Transaction-scoped operations (composed by the engine)
    // =========================================================================

    /// Current stock for a product name, inside a transaction.
    ///
    /// `None` means the product does not exist — fatal for the caller.
    pub async fn stock_of_tx(conn: &mut SqliteConnection, name: &str) -> DbResult<Option<i64>> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(stock)
    }

    /// Guarded stock decrement inside a transaction.
    ///
    /// Returns the number of rows affected: 0 means the guard refused —
    /// either the product vanished or stock would go negative. The caller
    /// decides which and aborts the whole transaction.
    pub async fn decrement_stock_tx(
        conn: &mut SqliteConnection,
        name: &str,
        quantity: i64,
    ) -> DbResult<u64> {
        debug!(name = %name, quantity = %quantity, "Decrementing stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?, updated_at = ?
            WHERE name = ? AND stock >= ?
            "#,
        )
        .bind(quantity)
        .bind(now)
        .bind(name)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Stock restoration inside a transaction (reversal path).
    ///
    /// ## Errors
    /// * `DbError::NotFound` - the catalog row was deleted since validation
    pub async fn restore_stock_tx(
        conn: &mut SqliteConnection,
        name: &str,
        quantity: i64,
    ) -> DbResult<()> {
        debug!(name = %name, quantity = %quantity, "Restoring stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?, updated_at = ?
            WHERE name = ?
            "#,
        )
        .bind(quantity)
        .bind(now)
        .bind(name)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", name));
        }

        Ok(())
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn product(name: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            name: name.to_string(),
            category: Category::Food,
            price_cents,
            cost_cents: 0,
            stock,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&product("Pastel", 800, 50)).await.unwrap();

        let found = repo.get_by_name("Pastel").await.unwrap().unwrap();
        assert_eq!(found.price_cents, 800);
        assert_eq!(found.stock, 50);

        assert!(repo.get_by_name("Coxinha").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&product("Pastel", 800, 50)).await.unwrap();
        let err = repo.insert(&product("Pastel", 900, 10)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_guarded_decrement_refuses_negative_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        repo.insert(&product("Pastel", 800, 3)).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let affected = ProductRepository::decrement_stock_tx(&mut tx, "Pastel", 5)
            .await
            .unwrap();
        assert_eq!(affected, 0);

        let affected = ProductRepository::decrement_stock_tx(&mut tx, "Pastel", 3)
            .await
            .unwrap();
        assert_eq!(affected, 1);
        tx.commit().await.unwrap();

        let found = repo.get_by_name("Pastel").await.unwrap().unwrap();
        assert_eq!(found.stock, 0);
    }

    #[tokio::test]
    async fn test_restore_stock_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        repo.insert(&product("Pastel", 800, 10)).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        ProductRepository::decrement_stock_tx(&mut tx, "Pastel", 4)
            .await
            .unwrap();
        ProductRepository::restore_stock_tx(&mut tx, "Pastel", 4)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(repo.get_by_name("Pastel").await.unwrap().unwrap().stock, 10);
    }
}
