// Staleness sweep: schedules never-run and outdated screenings

use crate::application::screening::ScreeningScheduler;
use crate::application::worker::constants::{DEFAULT_RESCREEN_INTERVAL_MS, SWEEP_BATCH_LIMIT};
use crate::error::{AppError, Result};
use crate::port::{ScreeningRepository, TimeProvider};
use std::sync::Arc;
use tracing::{error, info};

pub struct StalenessSweep {
    screenings: Arc<dyn ScreeningRepository>,
    scheduler: Arc<ScreeningScheduler>,
    time_provider: Arc<dyn TimeProvider>,
    rescreen_interval_ms: i64,
}

impl StalenessSweep {
    pub fn new(
        screenings: Arc<dyn ScreeningRepository>,
        scheduler: Arc<ScreeningScheduler>,
        time_provider: Arc<dyn TimeProvider>,
        rescreen_interval_ms: Option<i64>,
    ) -> Self {
        Self {
            screenings,
            scheduler,
            time_provider,
            rescreen_interval_ms: rescreen_interval_ms.unwrap_or(DEFAULT_RESCREEN_INTERVAL_MS),
        }
    }

    /// One sweep. Returns how many screenings were scheduled.
    pub async fn run_once(&self) -> Result<usize> {
        let now = self.time_provider.now_millis();
        let ids = self
            .screenings
            .find_stale_ids(now - self.rescreen_interval_ms, SWEEP_BATCH_LIMIT)
            .await?;

        let mut scheduled = 0;
        for id in ids {
            match self.scheduler.schedule(&id).await {
                Ok(_) => scheduled += 1,
                Err(AppError::NotFound(_)) => {}
                Err(e) => error!(screening_id = %id, error = %e, "Failed to reschedule stale screening"),
            }
        }

        if scheduled > 0 {
            info!(scheduled, "Staleness sweep complete");
        }
        Ok(scheduled)
    }
}
