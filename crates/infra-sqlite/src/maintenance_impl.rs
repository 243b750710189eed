// SQLite Maintenance Implementation
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use shipscreen_core::domain::JobState;
use shipscreen_core::error::Result;
use shipscreen_core::port::{Maintenance, MaintenanceStats, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

const FINISHED_STATES: [JobState; 3] = [JobState::Done, JobState::Failed, JobState::Superseded];

pub struct SqliteMaintenance {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteMaintenance {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    async fn db_size_bytes(&self) -> Result<i64> {
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(page_count * page_size)
    }

    async fn free_pages(&self) -> Result<(i64, i64)> {
        let free: i64 = sqlx::query_scalar("PRAGMA freelist_count")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let total: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok((free, total))
    }

    async fn count(&self, sql: &str) -> Result<i64> {
        sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

fn to_mb(bytes: i64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[async_trait]
impl Maintenance for SqliteMaintenance {
    async fn vacuum(&self) -> Result<f64> {
        let before = self.db_size_bytes().await?;

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let after = self.db_size_bytes().await?;
        let reclaimed = to_mb(before - after).max(0.0);

        info!(
            size_before_mb = to_mb(before),
            size_after_mb = to_mb(after),
            reclaimed_mb = reclaimed,
            "VACUUM completed"
        );

        Ok(reclaimed)
    }

    async fn gc_finished_jobs(&self, retention_days: i64) -> Result<i64> {
        let cutoff = self.time_provider.now_millis() - retention_days * 24 * 60 * 60 * 1000;

        let result = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE state IN (?, ?, ?)
            AND finished_at IS NOT NULL
            AND finished_at < ?
            "#,
        )
        .bind(FINISHED_STATES[0].to_string())
        .bind(FINISHED_STATES[1].to_string())
        .bind(FINISHED_STATES[2].to_string())
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let deleted = result.rows_affected() as i64;
        info!(deleted_jobs = deleted, cutoff, "Finished job GC completed");
        Ok(deleted)
    }

    async fn gc_cache(&self, retention_hours: i64) -> Result<u64> {
        let now = self.time_provider.now_millis();
        let cutoff = now - retention_hours * 60 * 60 * 1000;

        let entries = sqlx::query("DELETE FROM provider_cache WHERE fetched_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        let locks = sqlx::query("DELETE FROM locks WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        info!(
            deleted_cache_entries = entries,
            deleted_locks = locks,
            "Provider cache GC completed"
        );
        Ok(entries)
    }

    async fn get_stats(&self) -> Result<MaintenanceStats> {
        let db_size_bytes = self.db_size_bytes().await?;

        let job_count = self.count("SELECT COUNT(*) FROM jobs").await?;
        let finished_job_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE state IN (?, ?, ?)")
                .bind(FINISHED_STATES[0].to_string())
                .bind(FINISHED_STATES[1].to_string())
                .bind(FINISHED_STATES[2].to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        let screening_count = self.count("SELECT COUNT(*) FROM screenings").await?;
        let cache_entry_count = self.count("SELECT COUNT(*) FROM provider_cache").await?;

        let (free, total) = self.free_pages().await?;
        let fragmentation_percent = if total > 0 {
            free as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Ok(MaintenanceStats {
            db_size_mb: to_mb(db_size_bytes),
            db_size_bytes,
            job_count,
            finished_job_count,
            screening_count,
            cache_entry_count,
            fragmentation_percent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_pool;
    use crate::{SqliteJobRepository, SqliteLock, SqliteProviderCache};
    use shipscreen_core::domain::{Job, JobPayload, JobType};
    use shipscreen_core::port::time_provider::mocks::ManualClock;
    use shipscreen_core::port::{
        CacheEntry, DistributedLock, JobRepository, MaintenanceConfig, ProviderCache,
    };

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    #[tokio::test]
    async fn test_stats_on_empty_db() {
        let maintenance =
            SqliteMaintenance::new(memory_pool().await, Arc::new(ManualClock::new(0)));

        let stats = maintenance.get_stats().await.unwrap();
        assert!(stats.db_size_bytes > 0);
        assert_eq!(stats.job_count, 0);
        assert_eq!(stats.screening_count, 0);
        assert_eq!(stats.cache_entry_count, 0);

        assert!(maintenance.vacuum().await.unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_gc_finished_jobs_respects_retention() {
        let pool = memory_pool().await;
        let clock = Arc::new(ManualClock::new(30 * DAY_MS));
        let jobs = SqliteJobRepository::new(pool.clone(), clock.clone());
        let maintenance = SqliteMaintenance::new(pool, clock.clone());

        let mut old = Job::new_test(
            "screening",
            JobType::new("screening.check"),
            "screening:a:SHIP_FLAG",
            1,
            JobPayload::new(serde_json::json!({})),
        );
        old.state = JobState::Done;
        old.finished_at = Some(20 * DAY_MS);
        jobs.insert(&old).await.unwrap();

        let mut recent = old.clone();
        recent.id = "recent".to_string();
        recent.finished_at = Some(29 * DAY_MS);
        jobs.insert(&recent).await.unwrap();

        let mut queued = old.clone();
        queued.id = "queued".to_string();
        queued.state = JobState::Queued;
        queued.finished_at = None;
        jobs.insert(&queued).await.unwrap();

        assert_eq!(maintenance.gc_finished_jobs(7).await.unwrap(), 1);
        assert!(jobs.find_by_id(&old.id).await.unwrap().is_none());
        assert!(jobs.find_by_id(&recent.id).await.unwrap().is_some());
        assert!(jobs.find_by_id(&queued.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_full_run_drops_old_cache_and_expired_locks() {
        let pool = memory_pool().await;
        let clock = Arc::new(ManualClock::new(10 * DAY_MS));
        let cache = SqliteProviderCache::new(pool.clone());
        let lock = SqliteLock::new(pool.clone());
        let maintenance = SqliteMaintenance::new(pool, clock.clone());

        let entry = |fetched_at| CacheEntry {
            payload: serde_json::json!([]),
            fetched_at,
        };
        cache.put("inspections:9074729", &entry(DAY_MS)).await.unwrap();
        cache
            .put("inspections:9321483", &entry(10 * DAY_MS - 1000))
            .await
            .unwrap();
        lock.try_acquire("refresh:old", "w1", 1000, DAY_MS).await.unwrap();

        let report = maintenance
            .run_full_maintenance(&MaintenanceConfig::default(), true)
            .await
            .unwrap();

        assert!(report.vacuum_run);
        assert_eq!(report.cache_entries_deleted, 1);
        assert_eq!(report.stats_before.cache_entry_count, 2);
        assert_eq!(report.stats_after.cache_entry_count, 1);

        // The expired lock row is gone, so a fresh owner gets it
        assert!(lock
            .try_acquire("refresh:old", "w2", 1000, 10 * DAY_MS)
            .await
            .unwrap());
    }
}
