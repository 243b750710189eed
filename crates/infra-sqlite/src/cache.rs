// SQLite provider cache and database-backed lock

use crate::error::{corrupt, map_sqlx_error};
use async_trait::async_trait;
use shipscreen_core::error::Result;
use shipscreen_core::port::{CacheEntry, DistributedLock, ProviderCache};
use sqlx::SqlitePool;

pub struct SqliteProviderCache {
    pool: SqlitePool,
}

impl SqliteProviderCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProviderCache for SqliteProviderCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT payload, fetched_at FROM provider_cache WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(|(payload, fetched_at)| {
            Ok(CacheEntry {
                payload: serde_json::from_str(&payload)
                    .map_err(|e| corrupt("provider_cache.payload", e))?,
                fetched_at,
            })
        })
        .transpose()
    }

    async fn put(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO provider_cache (key, payload, fetched_at) VALUES (?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET
                payload = excluded.payload,
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(key)
        .bind(entry.payload.to_string())
        .bind(entry.fetched_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn purge_older_than(&self, cutoff: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM provider_cache WHERE fetched_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

/// Named lock rows with an expiry; an expired row can be taken over
pub struct SqliteLock {
    pool: SqlitePool,
}

impl SqliteLock {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DistributedLock for SqliteLock {
    async fn try_acquire(
        &self,
        name: &str,
        owner: &str,
        ttl_ms: i64,
        now_millis: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO locks (name, owner, expires_at) VALUES (?, ?, ?)
            ON CONFLICT (name) DO UPDATE SET
                owner = excluded.owner,
                expires_at = excluded.expires_at
            WHERE locks.expires_at <= ?
            "#,
        )
        .bind(name)
        .bind(owner)
        .bind(now_millis + ttl_ms)
        .bind(now_millis)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn release(&self, name: &str, owner: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM locks WHERE name = ? AND owner = ?")
            .bind(name)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
