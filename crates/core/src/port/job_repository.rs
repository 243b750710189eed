// Persistence of queued check jobs

use crate::domain::{Job, JobId, JobState};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert(&self, job: &Job) -> Result<()>;

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>>;

    /// Overwrites state, attempts, timestamps and error of an existing job
    async fn update(&self, job: &Job) -> Result<()>;

    /// Claims the next runnable job of `queue` and flips it to RUNNING in
    /// the same statement.
    ///
    /// Only the newest generation of a subject is runnable, and only once
    /// its `schedule_at` has passed.
    async fn pop_next(&self, queue: &str) -> Result<Option<Job>>;

    /// Writes a job back as QUEUED. A job whose subject already has a newer
    /// generation can never be popped again, so it is stored SUPERSEDED
    /// instead. Returns the state that was stored.
    async fn requeue(&self, job: &Job) -> Result<JobState>;

    async fn count_by_state(&self, queue: &str, state: JobState) -> Result<i64>;

    /// Every job in `state` across all queues
    async fn find_by_state(&self, state: JobState) -> Result<Vec<Job>>;
}
