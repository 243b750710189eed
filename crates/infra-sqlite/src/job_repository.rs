// SQLite JobRepository Implementation

use crate::error::{corrupt, map_sqlx_error};
use async_trait::async_trait;
use shipscreen_core::domain::{Job, JobId, JobPayload, JobState, JobType};
use shipscreen_core::error::{AppError, Result};
use shipscreen_core::port::{JobRepository, TimeProvider};
use sqlx::{Executor, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::debug;

pub struct SqliteJobRepository {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

/// Insert a job on any executor (pool or open transaction)
pub(crate) async fn insert_job<'e, E>(executor: E, job: &Job) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO jobs (
            id, queue, job_type, subject_key, generation,
            state, created_at, started_at, finished_at,
            payload, attempts, max_attempts, backoff_factor,
            schedule_at, last_error
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&job.id)
    .bind(&job.queue)
    .bind(job.job_type.as_str())
    .bind(&job.subject_key)
    .bind(job.generation)
    .bind(job.state.to_string())
    .bind(job.created_at)
    .bind(job.started_at)
    .bind(job.finished_at)
    .bind(job.payload.as_value().to_string())
    .bind(job.attempts)
    .bind(job.max_attempts)
    .bind(job.backoff_factor)
    .bind(job.schedule_at)
    .bind(&job.last_error)
    .execute(executor)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn insert(&self, job: &Job) -> Result<()> {
        insert_job(&self.pool, job).await
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn update(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?, started_at = ?, finished_at = ?,
                attempts = ?, schedule_at = ?, last_error = ?
            WHERE id = ?
            "#,
        )
        .bind(job.state.to_string())
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(job.attempts)
        .bind(job.schedule_at)
        .bind(&job.last_error)
        .bind(&job.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn pop_next(&self, queue: &str) -> Result<Option<Job>> {
        // Pop-time supersede: only the latest generation of a subject is runnable,
        // and a retried job waits for its backoff to pass.
        let now = self.time_provider.now_millis();

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET state = ?, started_at = ?
            WHERE id = (
                SELECT j.id FROM jobs j
                WHERE j.queue = ? AND j.state = ?
                  AND (j.schedule_at IS NULL OR j.schedule_at <= ?)
                  AND j.generation = (
                      SELECT MAX(generation)
                      FROM jobs
                      WHERE subject_key = j.subject_key
                  )
                ORDER BY j.created_at ASC, j.id ASC
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .bind(JobState::Running.to_string())
        .bind(now)
        .bind(queue)
        .bind(JobState::Queued.to_string())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }

    async fn requeue(&self, job: &Job) -> Result<JobState> {
        let now = self.time_provider.now_millis();

        // Same notion of "latest" as pop_next; SET sees the pre-update row
        let state: String = sqlx::query_scalar(
            r#"
            UPDATE jobs
            SET state = CASE WHEN generation < (
                    SELECT MAX(j.generation) FROM jobs j WHERE j.subject_key = jobs.subject_key
                ) THEN ? ELSE ? END,
                finished_at = CASE WHEN generation < (
                    SELECT MAX(j.generation) FROM jobs j WHERE j.subject_key = jobs.subject_key
                ) THEN ? ELSE NULL END,
                started_at = ?, attempts = ?, schedule_at = ?, last_error = ?
            WHERE id = ?
            RETURNING state
            "#,
        )
        .bind(JobState::Superseded.to_string())
        .bind(JobState::Queued.to_string())
        .bind(now)
        .bind(job.started_at)
        .bind(job.attempts)
        .bind(job.schedule_at)
        .bind(&job.last_error)
        .bind(&job.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| AppError::NotFound(format!("job {}", job.id)))?;

        let state: JobState = state.parse()?;
        if state == JobState::Superseded {
            debug!(
                job_id = %job.id,
                subject = %job.subject_key,
                "Newer run exists, superseding requeued job"
            );
        }
        Ok(state)
    }

    async fn count_by_state(&self, queue: &str, state: JobState) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE queue = ? AND state = ?")
                .bind(queue)
                .bind(state.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(count)
    }

    async fn find_by_state(&self, state: JobState) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT * FROM jobs
            WHERE state = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(state.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    queue: String,
    job_type: String,
    subject_key: String,
    generation: i64,
    state: String,
    created_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
    payload: String,
    attempts: i32,
    max_attempts: i32,
    backoff_factor: f64,
    schedule_at: Option<i64>,
    last_error: Option<String>,
}

impl JobRow {
    fn into_job(self) -> Result<Job> {
        let state: JobState = self.state.parse()?;
        let payload: serde_json::Value =
            serde_json::from_str(&self.payload).map_err(|e| corrupt("jobs.payload", e))?;

        Ok(Job {
            id: self.id,
            queue: self.queue,
            job_type: JobType::new(self.job_type),
            subject_key: self.subject_key,
            generation: self.generation,
            state,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            payload: JobPayload::new(payload),
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            backoff_factor: self.backoff_factor,
            schedule_at: self.schedule_at,
            last_error: self.last_error,
        })
    }
}
