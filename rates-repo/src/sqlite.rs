//! SQLite store adapter.

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use rates_types::{CurrencyCode, RateRecord, RateStore, RepoError};

use crate::types::DbRateRecord;

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Store
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite rate store implementation.
pub struct SqliteRateStore {
    pool: SqlitePool,
}

impl SqliteRateStore {
    /// Creates a new SQLite store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to `:memory:` opens a separate database, so keep one.
        let mut pool_options = SqlitePoolOptions::new();
        if database_url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        let store = Self { pool };
        store.create_schema().await?;

        tracing::debug!("SQLite rate store ready at {}", database_url);
        Ok(store)
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (idempotent).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_currency_rates.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RateStore for SqliteRateStore {
    async fn find(&self, code: CurrencyCode) -> Result<Option<RateRecord>, RepoError> {
        let row: Option<DbRateRecord> = sqlx::query_as(
            r#"SELECT currency_code, rate_to_base, last_update FROM currency_rates WHERE currency_code = ?"#,
        )
        .bind(code.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbRateRecord::into_domain).transpose()
    }

    async fn find_all(&self) -> Result<Vec<RateRecord>, RepoError> {
        let rows: Vec<DbRateRecord> = sqlx::query_as(
            r#"SELECT currency_code, rate_to_base, last_update FROM currency_rates ORDER BY currency_code"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbRateRecord::into_domain).collect()
    }

    async fn save(&self, record: &RateRecord) -> Result<RateRecord, RepoError> {
        let row = DbRateRecord::from_domain(record);

        sqlx::query(
            r#"INSERT INTO currency_rates (currency_code, rate_to_base, last_update) VALUES (?, ?, ?)
               ON CONFLICT(currency_code) DO UPDATE SET
                   rate_to_base = excluded.rate_to_base,
                   last_update = excluded.last_update"#,
        )
        .bind(&row.currency_code)
        .bind(&row.rate_to_base)
        .bind(&row.last_update)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(record.clone())
    }

    async fn delete(&self, code: CurrencyCode) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"DELETE FROM currency_rates WHERE currency_code = ?"#)
            .bind(code.code())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
