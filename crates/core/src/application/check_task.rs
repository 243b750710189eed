// Job handler running one screening check

use crate::application::checks::CheckRunner;
use crate::application::screening::CheckJobPayload;
use crate::application::worker::constants::CHECK_JOB_TYPE;
use crate::domain::{CheckOutcome, CheckTransition, DomainError, Job};
use crate::error::AppError;
use crate::port::{HandlerError, JobHandler, ScreeningRepository, ShipRepository, TimeProvider};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct CheckTaskHandler {
    screenings: Arc<dyn ScreeningRepository>,
    ships: Arc<dyn ShipRepository>,
    runner: Arc<CheckRunner>,
    time_provider: Arc<dyn TimeProvider>,
}

impl CheckTaskHandler {
    pub fn new(
        screenings: Arc<dyn ScreeningRepository>,
        ships: Arc<dyn ShipRepository>,
        runner: Arc<CheckRunner>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            screenings,
            ships,
            runner,
            time_provider,
        }
    }

    fn payload(job: &Job) -> Result<CheckJobPayload, HandlerError> {
        serde_json::from_value(job.payload.as_value().clone())
            .map_err(|e| HandlerError::InvalidPayload(e.to_string()))
    }

    /// Apply `transition` to the job's check under the screening's write
    /// lock. False when the run was replaced, the check is already closed or
    /// the screening is gone; the job then has nothing left to do.
    async fn transition(
        &self,
        payload: &CheckJobPayload,
        transition: CheckTransition,
    ) -> Result<bool, AppError> {
        let now = self.time_provider.now_millis();
        let applied = self
            .screenings
            .apply_check(
                &payload.screening_id,
                payload.scheduled_at,
                payload.check,
                transition,
                now,
            )
            .await;

        match applied {
            Ok(screening) => {
                debug!(
                    screening_id = %payload.screening_id,
                    check = %payload.check,
                    status = %screening.status,
                    "Check updated"
                );
                Ok(true)
            }
            Err(AppError::Domain(DomainError::StaleRun { .. })) => {
                debug!(
                    screening_id = %payload.screening_id,
                    check = %payload.check,
                    "Job from an earlier run, skipping"
                );
                Ok(false)
            }
            Err(AppError::Domain(DomainError::InvalidStateTransition { from, .. })) => {
                info!(
                    screening_id = %payload.screening_id,
                    check = %payload.check,
                    state = %from,
                    "Check already closed"
                );
                Ok(false)
            }
            Err(AppError::NotFound(_)) => {
                warn!(screening_id = %payload.screening_id, "Screening gone, skipping check");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl JobHandler for CheckTaskHandler {
    fn job_type(&self) -> &'static str {
        CHECK_JOB_TYPE
    }

    async fn handle(&self, job: &Job) -> Result<(), HandlerError> {
        let payload = Self::payload(job)?;

        let Some(screening) = self.screenings.find_by_id(&payload.screening_id).await? else {
            warn!(screening_id = %payload.screening_id, "Screening gone, skipping check");
            return Ok(());
        };
        if !self.transition(&payload, CheckTransition::Start).await? {
            return Ok(());
        }

        let outcome = match self.ships.find_by_imo(&screening.imo).await? {
            Some(ship) => self.runner.run(payload.check, &ship).await?,
            None => {
                warn!(imo = %screening.imo, "Ship master data missing");
                CheckOutcome::unknown(format!("ship {} not found", screening.imo))
            }
        };

        self.transition(&payload, CheckTransition::Complete(outcome))
            .await?;
        Ok(())
    }

    /// Close the check as UNKNOWN with the last error
    async fn give_up(&self, job: &Job, error: &HandlerError) -> Result<(), AppError> {
        let payload = match Self::payload(job) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Cannot close check of unreadable job");
                return Ok(());
            }
        };

        let outcome = CheckOutcome::unknown(error.to_string());
        self.transition(&payload, CheckTransition::Complete(outcome))
            .await?;
        Ok(())
    }
}
