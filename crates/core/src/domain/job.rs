// Job Domain Model: durable queue entry driving the check fan-out

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::error::{DomainError, Result};

pub type JobId = String;

/// `screening:{id}:{check}`; jobs sharing a subject supersede each other
pub type SubjectKey = String;

/// Bumped on every reschedule of a screening
pub type Generation = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
    Superseded,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Queued => write!(f, "QUEUED"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Done => write!(f, "DONE"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::Superseded => write!(f, "SUPERSEDED"),
        }
    }
}

impl FromStr for JobState {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(JobState::Queued),
            "RUNNING" => Ok(JobState::Running),
            "DONE" => Ok(JobState::Done),
            "FAILED" => Ok(JobState::Failed),
            "SUPERSEDED" => Ok(JobState::Superseded),
            other => Err(DomainError::UnknownVariant {
                kind: "job state",
                value: other.to_string(),
            }),
        }
    }
}

/// Handler routing key, e.g. `screening.check`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobType(String);

impl JobType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload(serde_json::Value);

impl JobPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// One queued unit of work; for screenings, one check of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub queue: String,
    pub job_type: JobType,
    pub subject_key: SubjectKey,
    pub generation: Generation,

    pub state: JobState,

    pub created_at: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,

    pub payload: JobPayload,

    pub attempts: i32,
    pub max_attempts: i32,
    pub backoff_factor: f64,
    /// Not popped before this time (epoch ms); set by retry backoff
    pub schedule_at: Option<i64>,
    pub last_error: Option<String>,
}

impl Job {
    /// Job with a process-wide counter id (`test-N`) and `created_at = N * 1000`
    pub fn new_test(
        queue: impl Into<String>,
        job_type: JobType,
        subject_key: impl Into<String>,
        generation: Generation,
        payload: JobPayload,
    ) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let id = format!("test-{}", counter);
        let created_at = (counter * 1000) as i64;

        Self::new(id, created_at, queue, job_type, subject_key, generation, payload)
    }

    /// Queued job with the default retry budget. Id and creation time come
    /// from the caller's providers.
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        queue: impl Into<String>,
        job_type: JobType,
        subject_key: impl Into<String>,
        generation: Generation,
        payload: JobPayload,
    ) -> Self {
        Self {
            id: id.into(),
            queue: queue.into(),
            job_type,
            subject_key: subject_key.into(),
            generation,
            state: JobState::Queued,
            created_at,
            started_at: None,
            finished_at: None,
            payload,
            attempts: 0,
            max_attempts: 3,
            backoff_factor: 2.0,
            schedule_at: None,
            last_error: None,
        }
    }

    fn transition(&mut self, from: JobState, to: JobState) -> Result<()> {
        if self.state != from {
            return Err(DomainError::InvalidStateTransition {
                subject: self.id.clone(),
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }

    /// QUEUED -> RUNNING; normally done by the repository's atomic pop
    pub fn start(&mut self, now_millis: i64) -> Result<()> {
        self.transition(JobState::Queued, JobState::Running)?;
        self.started_at = Some(now_millis);
        Ok(())
    }

    /// RUNNING -> DONE
    pub fn complete(&mut self, now_millis: i64) -> Result<()> {
        self.transition(JobState::Running, JobState::Done)?;
        self.finished_at = Some(now_millis);
        Ok(())
    }

    /// Terminal failure from any state, keeping the reason for operators
    pub fn fail(&mut self, now_millis: i64, reason: impl Into<String>) {
        self.state = JobState::Failed;
        self.finished_at = Some(now_millis);
        self.last_error = Some(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(
            "job-1",
            1000,
            "screening",
            JobType::new("screening.check"),
            "screening:s1:SHIP_FLAG",
            1,
            JobPayload::new(serde_json::json!({})),
        )
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = job();
        assert_eq!(job.state, JobState::Queued);

        assert!(job.start(2000).is_ok());
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.started_at, Some(2000));

        assert!(job.complete(3000).is_ok());
        assert_eq!(job.state, JobState::Done);
        assert_eq!(job.finished_at, Some(3000));
    }

    #[test]
    fn test_invalid_state_transitions() {
        let mut job = job();
        assert!(job.complete(2000).is_err());
        job.start(3000).unwrap();
        assert!(job.start(4000).is_err());
    }

    #[test]
    fn test_fail_records_reason() {
        let mut job = job();
        job.fail(5000, "provider unavailable");
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.last_error.as_deref(), Some("provider unavailable"));
    }
}
