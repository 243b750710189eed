// Screening scheduler: reset a screening and fan out one job per check

use crate::application::worker::constants::{CHECK_JOB_TYPE, SCREENING_QUEUE};
use crate::domain::{CheckKind, Job, JobPayload, JobType, Screening, ScreeningId};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, TimeProvider, TransactionalScreeningRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Payload of a `screening.check` job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckJobPayload {
    pub screening_id: ScreeningId,
    pub check: CheckKind,
    /// `scheduled_at` of the run that enqueued the job; older runs are skipped
    pub scheduled_at: i64,
}

/// Subject key of a check job; one live generation per screening check
pub fn check_subject_key(screening_id: &str, kind: CheckKind) -> String {
    format!("screening:{}:{}", screening_id, kind.as_str())
}

pub struct ScreeningScheduler {
    tx_repo: Arc<dyn TransactionalScreeningRepository>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    max_attempts: i32,
}

impl ScreeningScheduler {
    pub fn new(
        tx_repo: Arc<dyn TransactionalScreeningRepository>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        max_attempts: i32,
    ) -> Self {
        Self {
            tx_repo,
            id_provider,
            time_provider,
            max_attempts,
        }
    }

    /// Schedule every check of a screening in one transaction.
    ///
    /// A completed screening is snapshotted into history first. Queued jobs
    /// of an earlier run are superseded by the new generation.
    pub async fn schedule(&self, id: &ScreeningId) -> Result<Screening> {
        let mut tx = self.tx_repo.begin_transaction().await?;
        let now = self.time_provider.now_millis();

        let mut screening = match tx.lock_screening(id).await? {
            Some(s) => s,
            None => {
                tx.rollback().await?;
                return Err(AppError::NotFound(format!("screening {}", id)));
            }
        };

        let snapshot = screening.schedule(now);
        if let Some(entry) = &snapshot {
            tx.insert_history(entry).await?;
        }
        tx.save_screening(&screening).await?;

        let mut superseded = 0;
        for kind in CheckKind::ALL {
            let subject_key = check_subject_key(id, kind);
            let generation = tx.get_latest_generation(&subject_key).await? + 1;
            let payload = CheckJobPayload {
                screening_id: id.clone(),
                check: kind,
                scheduled_at: now,
            };

            let mut job = Job::new(
                self.id_provider.generate_id(),
                now,
                SCREENING_QUEUE,
                JobType::new(CHECK_JOB_TYPE),
                subject_key.clone(),
                generation,
                JobPayload::new(serde_json::to_value(&payload)?),
            );
            job.max_attempts = self.max_attempts;

            tx.insert_job(&job).await?;
            superseded += tx.mark_superseded(&subject_key, generation).await?;
        }

        tx.commit().await?;

        info!(
            screening_id = %id,
            imo = %screening.imo,
            checks = CheckKind::ALL.len(),
            superseded_jobs = superseded,
            history_recorded = snapshot.is_some(),
            "Screening scheduled"
        );

        Ok(screening)
    }
}
