//! # Points Config Repository
//!
//! The points configuration singleton: per-category accrual rates plus the
//! monetary worth of one point.
//!
//! ## Snapshot Semantics
//! The engine reads the configuration ONCE per validation, inside the same
//! transaction as the mutations, and passes the snapshot into the pure
//! loyalty math. An administrative update landing mid-validation therefore
//! affects the next validation, never a running one — and never a past one.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::info;

use crate::error::{DbError, DbResult};
use feira_core::{Category, PointsConfig};

/// Database row for the singleton config; rates are a JSON object keyed by
/// category name.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ConfigRow {
    point_value_cents: i64,
    rates_json: String,
}

impl ConfigRow {
    fn into_config(self) -> DbResult<PointsConfig> {
        let rates: BTreeMap<Category, i64> = serde_json::from_str(&self.rates_json)
            .map_err(|e| DbError::CorruptData(format!("points_config rates: {e}")))?;
        Ok(PointsConfig {
            point_value_cents: self.point_value_cents,
            rates,
        })
    }
}

/// Repository for the points configuration singleton.
#[derive(Debug, Clone)]
pub struct PointsConfigRepository {
    pool: SqlitePool,
}

impl PointsConfigRepository {
    /// Creates a new PointsConfigRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PointsConfigRepository { pool }
    }

    /// Reads the current configuration.
    pub async fn get(&self) -> DbResult<PointsConfig> {
        let row = sqlx::query_as::<_, ConfigRow>(
            "SELECT point_value_cents, rates_json FROM points_config WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        row.into_config()
    }

    /// Replaces the configuration.
    ///
    /// Takes effect on subsequent validations only; past ledger entries and
    /// stored per-line point costs are immutable historical facts.
    pub async fn update(&self, config: &PointsConfig) -> DbResult<()> {
        info!(
            point_value_cents = config.point_value_cents,
            rates = config.rates.len(),
            "Updating points configuration"
        );

        let rates_json = serde_json::to_string(&config.rates)
            .map_err(|e| DbError::Internal(format!("serialize rates: {e}")))?;
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE points_config
            SET point_value_cents = ?, rates_json = ?, updated_at = ?
            WHERE id = 1
            "#,
        )
        .bind(config.point_value_cents)
        .bind(rates_json)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// When the configuration was last changed.
    pub async fn updated_at(&self) -> DbResult<DateTime<Utc>> {
        let at: DateTime<Utc> =
            sqlx::query_scalar("SELECT updated_at FROM points_config WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(at)
    }

    // =========================================================================
    // Transaction-scoped operations (composed by the engine)
    // =========================================================================

    /// Reads the configuration snapshot inside a transaction.
    pub async fn get_tx(conn: &mut SqliteConnection) -> DbResult<PointsConfig> {
        let row = sqlx::query_as::<_, ConfigRow>(
            "SELECT point_value_cents, rates_json FROM points_config WHERE id = 1",
        )
        .fetch_one(&mut *conn)
        .await?;

        row.into_config()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
