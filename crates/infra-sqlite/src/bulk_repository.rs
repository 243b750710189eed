// SQLite BulkScreeningRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use shipscreen_core::domain::{BulkScreening, BulkScreeningId, BulkScreeningStatus};
use shipscreen_core::error::Result;
use shipscreen_core::port::BulkScreeningRepository;
use sqlx::SqlitePool;

pub struct SqliteBulkScreeningRepository {
    pool: SqlitePool,
}

impl SqliteBulkScreeningRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BulkRow {
    id: String,
    account_id: String,
    imo: String,
    status: String,
    screening_id: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl BulkRow {
    fn into_bulk(self) -> Result<BulkScreening> {
        Ok(BulkScreening {
            id: self.id,
            account_id: self.account_id,
            imo: self.imo,
            status: self.status.parse()?,
            screening_id: self.screening_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl BulkScreeningRepository for SqliteBulkScreeningRepository {
    async fn insert_many(&self, rows: &[BulkScreening]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO bulk_screenings (
                    id, account_id, imo, status, screening_id, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&row.id)
            .bind(&row.account_id)
            .bind(&row.imo)
            .bind(row.status.as_str())
            .bind(&row.screening_id)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn find_by_id(&self, id: &BulkScreeningId) -> Result<Option<BulkScreening>> {
        let row: Option<BulkRow> = sqlx::query_as("SELECT * FROM bulk_screenings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(BulkRow::into_bulk).transpose()
    }

    async fn find_pending(&self, limit: i64) -> Result<Vec<BulkScreening>> {
        let rows: Vec<BulkRow> = sqlx::query_as(
            r#"
            SELECT * FROM bulk_screenings
            WHERE status = ?
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(BulkScreeningStatus::Scheduled.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(BulkRow::into_bulk).collect()
    }

    async fn update(&self, row: &BulkScreening) -> Result<()> {
        sqlx::query(
            "UPDATE bulk_screenings SET status = ?, screening_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(row.status.as_str())
        .bind(&row.screening_id)
        .bind(row.updated_at)
        .bind(&row.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}
