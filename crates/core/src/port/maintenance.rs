// Housekeeping of the screening database
use crate::error::Result;
use async_trait::async_trait;

/// Size and row counts sampled before and after a run
#[derive(Debug, Clone)]
pub struct MaintenanceStats {
    pub db_size_mb: f64,
    pub db_size_bytes: i64,
    pub job_count: i64,
    pub finished_job_count: i64,
    pub screening_count: i64,
    pub cache_entry_count: i64,
    pub fragmentation_percent: f64,
}

#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// DONE, FAILED and SUPERSEDED jobs older than this many days are purged
    pub finished_job_retention_days: i64,

    /// VACUUM runs unasked once the file grows past this size
    pub max_db_size_mb: f64,

    /// Cached provider responses older than this many hours are purged
    pub cache_retention_hours: i64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            finished_job_retention_days: 7,
            max_db_size_mb: 1000.0,
            cache_retention_hours: 48,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaintenanceReport {
    pub vacuum_run: bool,
    pub jobs_deleted: i64,
    pub cache_entries_deleted: u64,
    pub stats_before: MaintenanceStats,
    pub stats_after: MaintenanceStats,
}

#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Returns reclaimed megabytes
    async fn vacuum(&self) -> Result<f64>;

    /// Returns deleted job rows
    async fn gc_finished_jobs(&self, retention_days: i64) -> Result<i64>;

    /// Also drops expired `refresh:*` locks; returns deleted cache rows
    async fn gc_cache(&self, retention_hours: i64) -> Result<u64>;

    async fn get_stats(&self) -> Result<MaintenanceStats>;

    /// Job GC, cache GC, then VACUUM when forced or oversized
    async fn run_full_maintenance(
        &self,
        config: &MaintenanceConfig,
        force_vacuum: bool,
    ) -> Result<MaintenanceReport> {
        let stats_before = self.get_stats().await?;

        let jobs_deleted = self
            .gc_finished_jobs(config.finished_job_retention_days)
            .await?;

        let cache_entries_deleted = self.gc_cache(config.cache_retention_hours).await?;

        let vacuum_run = force_vacuum || stats_before.db_size_mb > config.max_db_size_mb;
        let reclaimed_mb = if vacuum_run { self.vacuum().await? } else { 0.0 };

        let stats_after = self.get_stats().await?;

        tracing::info!(
            deleted_jobs = jobs_deleted,
            deleted_cache_entries = cache_entries_deleted,
            reclaimed_mb = reclaimed_mb,
            db_size_mb = stats_after.db_size_mb,
            "maintenance run finished"
        );

        Ok(MaintenanceReport {
            vacuum_run,
            jobs_deleted,
            cache_entries_deleted,
            stats_before,
            stats_after,
        })
    }
}
