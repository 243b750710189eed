// Retry with exponential backoff
use crate::domain::{Job, JobState};
use crate::port::TimeProvider;
use std::sync::Arc;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the job (with backoff delay in ms)
    Retry(i64),
    /// Do not retry, job has failed permanently
    Failed,
}

/// Retry policy
///
/// Determines if a job should be retried based on:
/// - Current attempt count
/// - Maximum attempts allowed
/// - Backoff factor for exponential delay
pub struct RetryPolicy {
    time_provider: Arc<dyn TimeProvider>,
    base_delay_ms: i64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `time_provider` - Time provider for current time
    /// * `base_delay_ms` - Base delay in milliseconds (default: 1000)
    pub fn new(time_provider: Arc<dyn TimeProvider>, base_delay_ms: i64) -> Self {
        Self {
            time_provider,
            base_delay_ms,
        }
    }

    /// Determine if a job should be retried
    ///
    /// Backoff formula: delay = base_delay * (backoff_factor ^ attempts).
    /// With the defaults this is a countdown of 1s, 2s, 4s.
    pub fn should_retry(&self, job: &Job) -> RetryDecision {
        if job.attempts >= job.max_attempts {
            warn!(
                job_id = %job.id,
                attempts = %job.attempts,
                max_attempts = %job.max_attempts,
                "Max retry attempts reached"
            );
            return RetryDecision::Failed;
        }

        let delay_ms = (self.base_delay_ms as f64 * job.backoff_factor.powi(job.attempts)) as i64;

        info!(
            job_id = %job.id,
            attempt = %job.attempts,
            max_attempts = %job.max_attempts,
            delay_ms = %delay_ms,
            "Scheduling retry"
        );

        RetryDecision::Retry(delay_ms)
    }

    /// Put a job back on the queue, not runnable before `now + delay_ms`
    pub fn prepare_for_retry(&self, job: &mut Job, delay_ms: i64, error: impl Into<String>) {
        let now = self.time_provider.now_millis();
        job.attempts += 1;
        job.state = JobState::Queued;
        job.started_at = None;
        job.schedule_at = Some(now + delay_ms);
        job.last_error = Some(error.into());

        info!(
            job_id = %job.id,
            attempt = %job.attempts,
            schedule_at = now + delay_ms,
            "Job prepared for retry"
        );
    }
}
