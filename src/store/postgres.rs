use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::KeyValueStore;
use crate::error::StoreResult;

#[derive(sqlx::FromRow)]
struct ValueRow {
    value: String,
}

/// Keys live in a `kv_store` table, one row per key.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for PgStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let row = sqlx::query_as::<_, ValueRow>("SELECT value FROM kv_store WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("❌ DB error reading `{}`: {:?}", key, e);
                e
            })?;
        Ok(row.map(|r| r.value))
    }

    async fn put(&self, key: &str, value: String) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES ($1, $2, now())
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                tracing::error!("❌ DB upsert failed: {}", db_err.message());

                if let Some(code) = db_err.code() {
                    tracing::info!("ℹ️ SQLSTATE code: {}", code);
                }
            } else {
                tracing::error!("❌ Unknown DB error: {}", e);
            }
            e
        })?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
