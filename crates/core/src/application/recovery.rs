// Crash recovery of orphaned jobs
use crate::domain::JobState;
use crate::error::Result;
use crate::port::{JobRepository, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// Requeues check jobs left RUNNING by a daemon that died mid-run.
///
/// Handlers run inside the daemon, so before the first worker pops every
/// RUNNING row is an orphan no matter how recently it was claimed. Check
/// jobs only read providers and write their own check slot, so a second
/// execution is harmless.
pub struct RecoveryService {
    job_repo: Arc<dyn JobRepository>,
    clock: Arc<dyn TimeProvider>,
}

/// What startup recovery did with the RUNNING jobs it found
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    pub requeued: usize,
    /// A newer run of the same check exists
    pub superseded: usize,
    /// RUNNING without a start time
    pub failed: usize,
}

impl RecoveryReport {
    pub fn total(&self) -> usize {
        self.requeued + self.superseded + self.failed
    }
}

impl RecoveryService {
    pub fn new(job_repo: Arc<dyn JobRepository>, clock: Arc<dyn TimeProvider>) -> Self {
        Self { job_repo, clock }
    }

    /// Must run before any worker starts popping
    pub async fn recover_orphaned_jobs(&self) -> Result<RecoveryReport> {
        let now = self.clock.now_millis();
        let mut report = RecoveryReport::default();

        for mut job in self.job_repo.find_by_state(JobState::Running).await? {
            if job.started_at.is_none() {
                warn!(job_id = %job.id, "running job has no start time, failing it");
                job.fail(now, "running without start time");
                self.job_repo.update(&job).await?;
                report.failed += 1;
                continue;
            }

            job.state = JobState::Queued;
            job.started_at = None;
            job.schedule_at = None;
            match self.job_repo.requeue(&job).await? {
                JobState::Superseded => report.superseded += 1,
                _ => {
                    info!(
                        job_id = %job.id,
                        subject = %job.subject_key,
                        "requeuing orphaned check job"
                    );
                    report.requeued += 1;
                }
            }
        }

        if report.total() > 0 {
            info!(
                requeued = report.requeued,
                superseded = report.superseded,
                failed = report.failed,
                "recovered orphaned jobs"
            );
        }
        Ok(report)
    }
}
