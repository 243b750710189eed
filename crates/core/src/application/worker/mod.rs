// Worker - Job execution loop

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::domain::{Job, JobState};
use crate::error::Result;
use crate::port::{HandlerError, JobHandler, JobRepository, TimeProvider};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Worker processes jobs from a queue, dispatching on job type
pub struct Worker {
    queue: String,
    job_repo: Arc<dyn JobRepository>,
    handlers: HashMap<&'static str, Arc<dyn JobHandler>>,
    retry_policy: Arc<RetryPolicy>,
    time_provider: Arc<dyn TimeProvider>,
}

impl Worker {
    pub fn new(
        queue: impl Into<String>,
        job_repo: Arc<dyn JobRepository>,
        handlers: Vec<Arc<dyn JobHandler>>,
        retry_policy: Arc<RetryPolicy>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let handlers = handlers
            .into_iter()
            .map(|handler| (handler.job_type(), handler))
            .collect();

        Self {
            queue: queue.into(),
            job_repo,
            handlers,
            retry_policy,
            time_provider,
        }
    }

    /// Run worker loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!("Worker started for queue: {}", self.queue);
        loop {
            if shutdown.is_shutdown() {
                info!("Worker shutting down for queue: {}", self.queue);
                break;
            }
            match self.process_next_job().await {
                Ok(true) => {}
                Ok(false) => {
                    tokio::select! {
                        _ = sleep(IDLE_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!("Worker interrupted during idle");
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!("Worker error: {}", e);
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!("Worker interrupted during error recovery");
                            break;
                        }
                    }
                }
            }
        }
        info!("Worker stopped for queue: {}", self.queue);
        Ok(())
    }

    /// Process next job from queue (returns true if a job was processed)
    pub async fn process_next_job(&self) -> Result<bool> {
        // Pop next job (already atomically set to RUNNING in DB)
        let mut job = match self.job_repo.pop_next(&self.queue).await? {
            Some(j) => j,
            None => return Ok(false),
        };

        let handler = match self.handlers.get(job.job_type.as_str()) {
            Some(handler) => Arc::clone(handler),
            None => {
                error!(job_id = %job.id, job_type = %job.job_type.as_str(), "No handler for job type");
                job.fail(self.time_provider.now_millis(), "no handler for job type");
                self.job_repo.update(&job).await?;
                return Ok(true);
            }
        };

        debug!(
            job_id = %job.id,
            subject_key = %job.subject_key,
            attempt = job.attempts,
            "Processing job"
        );

        // Panic isolation: a panicking handler must not take the worker down
        let job_arc = Arc::new(job);
        let job_for_exec = Arc::clone(&job_arc);
        let exec_handler = Arc::clone(&handler);
        let execution_result =
            tokio::task::spawn(async move { exec_handler.handle(&job_for_exec).await }).await;

        let mut job = Arc::try_unwrap(job_arc).unwrap_or_else(|arc| (*arc).clone());

        match execution_result {
            Ok(Ok(())) => {
                job.complete(self.time_provider.now_millis())?;
                debug!(job_id = %job.id, "Job completed");
                self.job_repo.update(&job).await?;
            }
            Ok(Err(e)) if e.is_retryable() => match self.retry_policy.should_retry(&job) {
                RetryDecision::Retry(delay_ms) => {
                    warn!(
                        job_id = %job.id,
                        attempt = %job.attempts,
                        delay_ms = %delay_ms,
                        error = %e,
                        "Retrying job after failure"
                    );
                    self.retry_policy.prepare_for_retry(&mut job, delay_ms, e.to_string());
                    if self.job_repo.requeue(&job).await? == JobState::Superseded {
                        debug!(job_id = %job.id, "Run replaced meanwhile, retry dropped");
                    }
                }
                RetryDecision::Failed => {
                    error!(job_id = %job.id, error = %e, "Job failed after max retries");
                    self.give_up(handler.as_ref(), job, e).await?;
                }
            },
            Ok(Err(e)) => {
                error!(job_id = %job.id, error = %e, "Job failed");
                self.give_up(handler.as_ref(), job, e).await?;
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    "handler panicked"
                } else {
                    "handler cancelled"
                };
                error!(job_id = %job.id, error = ?join_err, "{}", reason);
                self.give_up(handler.as_ref(), job, HandlerError::Fatal(reason.to_string()))
                    .await?;
            }
        }
        Ok(true)
    }

    /// Let the handler record the final failure, then mark the job FAILED
    async fn give_up(&self, handler: &dyn JobHandler, mut job: Job, e: HandlerError) -> Result<()> {
        if let Err(give_up_err) = handler.give_up(&job, &e).await {
            error!(job_id = %job.id, error = %give_up_err, "Handler give-up failed");
        }
        job.fail(self.time_provider.now_millis(), e.to_string());
        self.job_repo.update(&job).await
    }
}
