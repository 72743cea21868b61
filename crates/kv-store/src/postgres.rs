use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    Result,
    store::{KeyValueStore, validate_key},
};

/// PostgreSQL-backed key/value store implementation.
///
/// Values live in the `kv_store` table; `set` is an upsert, so the last write
/// for a key wins.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url` and creates a store.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Returns when `key` was last written, if it exists.
    pub async fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        validate_key(key)?;
        let ts = sqlx::query_scalar("SELECT updated_at FROM kv_store WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ts)
    }
}

#[async_trait]
impl KeyValueStore for PostgresStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let value = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        validate_key(key)?;
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        sqlx::query("DELETE FROM kv_store WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
