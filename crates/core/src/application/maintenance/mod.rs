// Scheduled maintenance operations: job GC, cache GC, VACUUM

use crate::application::worker::ShutdownToken;
use crate::error::Result;
use crate::port::{Maintenance, MaintenanceConfig, MaintenanceReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

/// Maintenance scheduler
///
/// Runs periodic maintenance operations (VACUUM, GC) in the background
pub struct MaintenanceScheduler {
    maintenance: Arc<dyn Maintenance>,
    config: MaintenanceConfig,
    interval_hours: u64,
}

impl MaintenanceScheduler {
    /// Create a new maintenance scheduler
    ///
    /// # Arguments
    /// * `maintenance` - Maintenance implementation
    /// * `config` - Maintenance configuration
    /// * `interval_hours` - How often to run maintenance (hours)
    pub fn new(
        maintenance: Arc<dyn Maintenance>,
        config: MaintenanceConfig,
        interval_hours: u64,
    ) -> Self {
        Self {
            maintenance,
            config,
            interval_hours,
        }
    }

    /// Run maintenance loop until shutdown
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(
            interval_hours = self.interval_hours,
            retention_days = self.config.finished_job_retention_days,
            cache_retention_hours = self.config.cache_retention_hours,
            "Maintenance scheduler started"
        );

        let mut tick = interval(Duration::from_secs(self.interval_hours.max(1) * 3600));
        // First tick completes immediately; skip it so startup stays quick
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    info!("Running scheduled maintenance...");
                    match self.maintenance.run_full_maintenance(&self.config, false).await {
                        Ok(report) => {
                            info!(
                                db_size_mb = report.stats_after.db_size_mb,
                                jobs_deleted = report.jobs_deleted,
                                cache_entries_deleted = report.cache_entries_deleted,
                                vacuum_run = report.vacuum_run,
                                "Scheduled maintenance completed successfully"
                            );
                        }
                        Err(e) => {
                            error!(error = ?e, "Scheduled maintenance failed");
                        }
                    }
                }
                _ = shutdown.wait() => {
                    info!("Maintenance scheduler stopped");
                    break;
                }
            }
        }
    }

    /// Run maintenance immediately (for manual trigger)
    pub async fn run_now(&self, force_vacuum: bool) -> Result<MaintenanceReport> {
        info!(force_vacuum, "Running manual maintenance...");

        let report = self
            .maintenance
            .run_full_maintenance(&self.config, force_vacuum)
            .await?;

        info!(
            db_size_mb = report.stats_after.db_size_mb,
            job_count = report.stats_after.job_count,
            "Manual maintenance completed"
        );

        Ok(report)
    }
}
