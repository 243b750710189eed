// SQLite Transaction Implementation

use crate::error::map_sqlx_error;
use crate::job_repository::insert_job;
use crate::screening_rows;
use async_trait::async_trait;
use shipscreen_core::domain::{HistoryEntry, Job, JobState, Screening, ScreeningId};
use shipscreen_core::error::Result;
use shipscreen_core::port::{SchedulingTransaction, TimeProvider, Transaction};
use sqlx::{Sqlite, Transaction as SqlxTransaction};
use std::sync::Arc;

pub struct SqliteSchedulingTransaction {
    tx: SqlxTransaction<'static, Sqlite>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteSchedulingTransaction {
    pub fn new(tx: SqlxTransaction<'static, Sqlite>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { tx, time_provider }
    }
}

#[async_trait]
impl Transaction for SqliteSchedulingTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}

#[async_trait]
impl SchedulingTransaction for SqliteSchedulingTransaction {
    async fn lock_screening(&mut self, id: &ScreeningId) -> Result<Option<Screening>> {
        if !screening_rows::lock_screening_row(&mut *self.tx, id).await? {
            return Ok(None);
        }
        screening_rows::load_screening(&mut *self.tx, id).await
    }

    async fn save_screening(&mut self, screening: &Screening) -> Result<()> {
        screening_rows::save_screening(&mut *self.tx, screening).await
    }

    async fn insert_history(&mut self, entry: &HistoryEntry) -> Result<()> {
        screening_rows::insert_history(&mut *self.tx, entry).await
    }

    async fn get_latest_generation(&mut self, subject_key: &str) -> Result<i64> {
        let gen: Option<i64> =
            sqlx::query_scalar("SELECT latest_generation FROM subjects WHERE subject_key = ?")
                .bind(subject_key)
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(map_sqlx_error)?;

        match gen {
            Some(g) => Ok(g),
            None => {
                // Insert new subject with generation 0
                sqlx::query("INSERT INTO subjects (subject_key, latest_generation) VALUES (?, 0)")
                    .bind(subject_key)
                    .execute(&mut *self.tx)
                    .await
                    .map_err(map_sqlx_error)?;
                Ok(0)
            }
        }
    }

    async fn insert_job(&mut self, job: &Job) -> Result<()> {
        insert_job(&mut *self.tx, job).await
    }

    async fn mark_superseded(&mut self, subject_key: &str, below_generation: i64) -> Result<u64> {
        let now = self.time_provider.now_millis();

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?, finished_at = ?
            WHERE subject_key = ? AND generation < ? AND state = ?
            "#,
        )
        .bind(JobState::Superseded.to_string())
        .bind(now)
        .bind(subject_key)
        .bind(below_generation)
        .bind(JobState::Queued.to_string())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("UPDATE subjects SET latest_generation = ? WHERE subject_key = ?")
            .bind(below_generation)
            .bind(subject_key)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
