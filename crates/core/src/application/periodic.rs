// Periodic pipeline tasks: killer, staleness sweep, bulk processing

use crate::application::bulk::{BulkScreeningService, BulkSummary};
use crate::application::killer::ScreeningKiller;
use crate::application::staleness::StalenessSweep;
use crate::application::worker::constants::SWEEP_BATCH_LIMIT;
use crate::application::worker::ShutdownToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Outcome of one round of periodic tasks
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub killed: usize,
    pub rescheduled: usize,
    pub bulk: BulkSummary,
}

pub struct PeriodicTasks {
    killer: Arc<ScreeningKiller>,
    staleness: Arc<StalenessSweep>,
    bulk: Arc<BulkScreeningService>,
    period: Duration,
}

impl PeriodicTasks {
    pub fn new(
        killer: Arc<ScreeningKiller>,
        staleness: Arc<StalenessSweep>,
        bulk: Arc<BulkScreeningService>,
        period: Duration,
    ) -> Self {
        Self {
            killer,
            staleness,
            bulk,
            period,
        }
    }

    /// Run every task once. A failing task does not stop the others.
    pub async fn run_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        match self.killer.run_once().await {
            Ok(killed) => report.killed = killed,
            Err(e) => error!(error = %e, "Killer sweep failed"),
        }
        match self.staleness.run_once().await {
            Ok(rescheduled) => report.rescheduled = rescheduled,
            Err(e) => error!(error = %e, "Staleness sweep failed"),
        }
        match self.bulk.process_pending(SWEEP_BATCH_LIMIT).await {
            Ok(summary) => report.bulk = summary,
            Err(e) => error!(error = %e, "Bulk processing failed"),
        }

        report
    }

    /// Loop until shutdown
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(period_secs = self.period.as_secs(), "Periodic tasks started");

        let mut tick = interval(self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.run_once().await;
                }
                _ = shutdown.wait() => {
                    info!("Periodic tasks stopped");
                    break;
                }
            }
        }
    }
}
