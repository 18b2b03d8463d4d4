//! # Admin Repository
//!
//! Storage for administrative actors — the only people whose credential can
//! validate a batch.
//!
//! Hashing and verification of credentials live in feira-engine; this
//! repository only moves hashes in and out of the `admins` table.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use feira_core::Admin;

/// Database row for an admin. Maps 1:1 onto [`feira_core::Admin`].
#[derive(Debug, Clone, sqlx::FromRow)]
struct AdminRow {
    id: String,
    name: String,
    credential_hash: String,
    active: bool,
    created_at: chrono::DateTime<Utc>,
}

impl From<AdminRow> for Admin {
    fn from(row: AdminRow) -> Self {
        Admin {
            id: row.id,
            name: row.name,
            credential_hash: row.credential_hash,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

const SELECT_COLUMNS: &str = "id, name, credential_hash, active, created_at";

/// Repository for admin database operations.
#[derive(Debug, Clone)]
pub struct AdminRepository {
    pool: SqlitePool,
}

impl AdminRepository {
    /// Creates a new AdminRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AdminRepository { pool }
    }

    /// Registers a new admin with an already-hashed credential.
    pub async fn insert(&self, name: &str, credential_hash: &str) -> DbResult<Admin> {
        debug!(name = %name, "Registering admin");

        let admin = Admin {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            credential_hash: credential_hash.to_string(),
            active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO admins (id, name, credential_hash, active, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&admin.id)
        .bind(&admin.name)
        .bind(&admin.credential_hash)
        .bind(admin.active)
        .bind(admin.created_at)
        .execute(&self.pool)
        .await?;

        Ok(admin)
    }

    /// Lists active admins.
    pub async fn list_active(&self) -> DbResult<Vec<Admin>> {
        let rows = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM admins WHERE active = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Admin::from).collect())
    }

    /// Deactivates an admin by display name. Their credential stops
    /// resolving on the next validation attempt.
    pub async fn deactivate(&self, name: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE admins SET active = 0 WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Admin", name));
        }

        Ok(())
    }

    // =========================================================================
    // Transaction-scoped operations (composed by the engine)
    // =========================================================================

    /// Lists active admins inside a transaction.
    ///
    /// The engine resolves the acting credential against this set INSIDE the
    /// validation transaction, closing the gap between the authorization
    /// check and the mutation it gates.
    pub async fn list_active_tx(conn: &mut SqliteConnection) -> DbResult<Vec<Admin>> {
        let rows = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM admins WHERE active = 1"
        ))
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(Admin::from).collect())
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
    async fn test_insert_list_deactivate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.admins();

        repo.insert("Padre João", "$argon2-hash").await.unwrap();
        repo.insert("Irmã Clara", "$argon2-hash-2").await.unwrap();

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 2);

        repo.deactivate("Padre João").await.unwrap();
        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Irmã Clara");
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.admins();

        repo.insert("Padre João", "h1").await.unwrap();
        let err = repo.insert("Padre João", "h2").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
