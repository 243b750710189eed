// Screening Repository Port

use crate::domain::{
    CheckKind, CheckTransition, HistoryEntry, Imo, Screening, ScreeningId, ScreeningStatus,
};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ScreeningRepository: Send + Sync {
    /// Insert a new screening; `Conflict` if the account already screens the ship
    async fn insert(&self, screening: &Screening) -> Result<()>;

    async fn find_by_id(&self, id: &ScreeningId) -> Result<Option<Screening>>;

    async fn find_by_account_and_imo(&self, account_id: &str, imo: &Imo)
        -> Result<Option<Screening>>;

    /// IDs of every screening of a ship, across accounts
    async fn find_ids_by_imo(&self, imo: &Imo) -> Result<Vec<ScreeningId>>;

    /// CREATED screenings, and DONE screenings completed before `completed_before`
    async fn find_stale_ids(&self, completed_before: i64, limit: i64) -> Result<Vec<ScreeningId>>;

    /// SCHEDULED/IN_PROGRESS screenings scheduled before `scheduled_before`
    async fn find_stuck_ids(&self, scheduled_before: i64, limit: i64) -> Result<Vec<ScreeningId>>;

    /// Apply a check transition and recompute the aggregate in one write
    /// transaction. `NotFound` if the screening is gone, `StaleRun` if it
    /// was rescheduled away from the run started at `run_scheduled_at`.
    async fn apply_check(
        &self,
        id: &ScreeningId,
        run_scheduled_at: i64,
        kind: CheckKind,
        transition: CheckTransition,
        now_millis: i64,
    ) -> Result<Screening>;

    /// Force all incomplete checks to DONE/UNKNOWN in one write transaction.
    /// Returns the updated screening and how many checks were forced.
    async fn force_complete(&self, id: &ScreeningId, now_millis: i64)
        -> Result<(Screening, usize)>;

    /// History snapshots, newest first
    async fn history(&self, id: &ScreeningId) -> Result<Vec<HistoryEntry>>;

    async fn count_by_status(&self, status: ScreeningStatus) -> Result<i64>;
}
