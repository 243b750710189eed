// Bulk Screening Repository Port

use crate::domain::{BulkScreening, BulkScreeningId};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait BulkScreeningRepository: Send + Sync {
    /// Insert all rows atomically
    async fn insert_many(&self, rows: &[BulkScreening]) -> Result<()>;

    async fn find_by_id(&self, id: &BulkScreeningId) -> Result<Option<BulkScreening>>;

    /// Oldest SCHEDULED rows first
    async fn find_pending(&self, limit: i64) -> Result<Vec<BulkScreening>>;

    async fn update(&self, row: &BulkScreening) -> Result<()>;
}
