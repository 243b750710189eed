// Screening killer: closes screenings stuck in flight

use crate::application::worker::constants::{DEFAULT_KILL_AFTER_MS, SWEEP_BATCH_LIMIT};
use crate::error::{AppError, Result};
use crate::port::{ScreeningRepository, TimeProvider};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Forces every incomplete check of a screening scheduled longer ago than
/// `kill_after_ms` to DONE/UNKNOWN.
pub struct ScreeningKiller {
    screenings: Arc<dyn ScreeningRepository>,
    time_provider: Arc<dyn TimeProvider>,
    kill_after_ms: i64,
}

impl ScreeningKiller {
    pub fn new(
        screenings: Arc<dyn ScreeningRepository>,
        time_provider: Arc<dyn TimeProvider>,
        kill_after_ms: Option<i64>,
    ) -> Self {
        Self {
            screenings,
            time_provider,
            kill_after_ms: kill_after_ms.unwrap_or(DEFAULT_KILL_AFTER_MS),
        }
    }

    /// One sweep. Returns how many screenings were closed.
    pub async fn run_once(&self) -> Result<usize> {
        let now = self.time_provider.now_millis();
        let ids = self
            .screenings
            .find_stuck_ids(now - self.kill_after_ms, SWEEP_BATCH_LIMIT)
            .await?;

        let mut killed = 0;
        for id in ids {
            match self.screenings.force_complete(&id, now).await {
                Ok((screening, forced)) => {
                    warn!(
                        screening_id = %id,
                        imo = %screening.imo,
                        forced_checks = forced,
                        severity = ?screening.severity,
                        "Screening timed out"
                    );
                    killed += 1;
                }
                Err(AppError::NotFound(_)) => {}
                Err(e) => error!(screening_id = %id, error = %e, "Failed to close screening"),
            }
        }

        if killed > 0 {
            info!(killed, "Killer sweep complete");
        }
        Ok(killed)
    }
}
