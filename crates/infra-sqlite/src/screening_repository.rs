// SQLite ScreeningRepository Implementation

use crate::error::{is_unique_violation, map_sqlx_error};
use crate::screening_rows::{self, HistoryRow};
use crate::transaction::SqliteSchedulingTransaction;
use async_trait::async_trait;
use shipscreen_core::domain::{
    CheckKind, CheckTransition, HistoryEntry, Imo, Screening, ScreeningId, ScreeningStatus,
};
use shipscreen_core::error::{AppError, Result};
use shipscreen_core::port::{
    SchedulingTransaction, ScreeningRepository, TimeProvider, TransactionalScreeningRepository,
};
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteScreeningRepository {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteScreeningRepository {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// Lock, mutate and save one screening in a single write transaction
    async fn modify<T, F>(&self, id: &ScreeningId, mutate: F) -> Result<(Screening, T)>
    where
        F: FnOnce(&mut Screening) -> Result<T> + Send,
        T: Send,
    {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        if !screening_rows::lock_screening_row(&mut *tx, id).await? {
            return Err(AppError::NotFound(format!("screening {}", id)));
        }
        let mut screening = screening_rows::load_screening(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("screening {}", id)))?;

        // Dropping `tx` on error rolls back
        let value = mutate(&mut screening)?;
        screening_rows::save_screening(&mut *tx, &screening).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok((screening, value))
    }
}

#[async_trait]
impl ScreeningRepository for SqliteScreeningRepository {
    async fn insert(&self, screening: &Screening) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        if let Err(e) = screening_rows::insert_screening_row(&mut *tx, screening).await {
            return Err(if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "screening of {} for account {} already exists",
                    screening.imo, screening.account_id
                ))
            } else {
                map_sqlx_error(e)
            });
        }
        screening_rows::save_checks(&mut *tx, screening).await?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn find_by_id(&self, id: &ScreeningId) -> Result<Option<Screening>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        screening_rows::load_screening(&mut *conn, id).await
    }

    async fn find_by_account_and_imo(
        &self,
        account_id: &str,
        imo: &Imo,
    ) -> Result<Option<Screening>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;

        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM screenings WHERE account_id = ? AND imo = ?")
                .bind(account_id)
                .bind(imo.as_str())
                .fetch_optional(&mut *conn)
                .await
                .map_err(map_sqlx_error)?;

        match id {
            Some(id) => screening_rows::load_screening(&mut *conn, &id).await,
            None => Ok(None),
        }
    }

    async fn find_ids_by_imo(&self, imo: &Imo) -> Result<Vec<ScreeningId>> {
        sqlx::query_scalar("SELECT id FROM screenings WHERE imo = ? ORDER BY created_at ASC")
            .bind(imo.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_stale_ids(&self, completed_before: i64, limit: i64) -> Result<Vec<ScreeningId>> {
        sqlx::query_scalar(
            r#"
            SELECT id FROM screenings
            WHERE status = ?
               OR (status = ? AND (completed_at IS NULL OR completed_at <= ?))
            ORDER BY COALESCE(completed_at, created_at) ASC
            LIMIT ?
            "#,
        )
        .bind(ScreeningStatus::Created.as_str())
        .bind(ScreeningStatus::Done.as_str())
        .bind(completed_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_stuck_ids(&self, scheduled_before: i64, limit: i64) -> Result<Vec<ScreeningId>> {
        sqlx::query_scalar(
            r#"
            SELECT id FROM screenings
            WHERE status IN (?, ?) AND scheduled_at < ?
            ORDER BY scheduled_at ASC
            LIMIT ?
            "#,
        )
        .bind(ScreeningStatus::Scheduled.as_str())
        .bind(ScreeningStatus::InProgress.as_str())
        .bind(scheduled_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn apply_check(
        &self,
        id: &ScreeningId,
        run_scheduled_at: i64,
        kind: CheckKind,
        transition: CheckTransition,
        now_millis: i64,
    ) -> Result<Screening> {
        let (screening, ()) = self
            .modify(id, move |screening| {
                screening.ensure_run(run_scheduled_at)?;
                screening.apply_check(kind, transition, now_millis)?;
                Ok(())
            })
            .await?;
        Ok(screening)
    }

    async fn force_complete(
        &self,
        id: &ScreeningId,
        now_millis: i64,
    ) -> Result<(Screening, usize)> {
        self.modify(id, move |screening| Ok(screening.force_complete(now_millis)))
            .await
    }

    async fn history(&self, id: &ScreeningId) -> Result<Vec<HistoryEntry>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT screening_id, severity, severity_change, checks, completed_at, recorded_at
            FROM screening_history
            WHERE screening_id = ?
            ORDER BY recorded_at DESC, id DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(HistoryRow::into_entry).collect()
    }

    async fn count_by_status(&self, status: ScreeningStatus) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM screenings WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl TransactionalScreeningRepository for SqliteScreeningRepository {
    async fn begin_transaction(&self) -> Result<Box<dyn SchedulingTransaction>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteSchedulingTransaction::new(
            tx,
            Arc::clone(&self.time_provider),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_pool;
    use shipscreen_core::domain::{CheckOutcome, DomainError, Severity};
    use shipscreen_core::port::time_provider::mocks::ManualClock;
    use shipscreen_core::port::Transaction;

    const NOW: i64 = 1_700_000_000_000;

    async fn repo() -> SqliteScreeningRepository {
        SqliteScreeningRepository::new(memory_pool().await, Arc::new(ManualClock::new(NOW)))
    }

    fn screening(id: &str, account: &str) -> Screening {
        Screening::new(id, account, Imo::parse("9074729").unwrap(), NOW)
    }

    async fn schedule(repo: &SqliteScreeningRepository, id: &str, now: i64) -> Screening {
        let mut tx = repo.begin_transaction().await.unwrap();
        let mut s = tx.lock_screening(&id.to_string()).await.unwrap().unwrap();
        if let Some(entry) = s.schedule(now) {
            tx.insert_history(&entry).await.unwrap();
        }
        tx.save_screening(&s).await.unwrap();
        tx.commit().await.unwrap();
        s
    }

    #[tokio::test]
    async fn test_insert_and_load_round_trip() {
        let repo = repo().await;
        let s = screening("scr-1", "acct-1");
        repo.insert(&s).await.unwrap();

        let loaded = repo.find_by_id(&s.id).await.unwrap().unwrap();
        assert_eq!(loaded, s);
        assert_eq!(loaded.checks.len(), CheckKind::ALL.len());

        let by_pair = repo
            .find_by_account_and_imo("acct-1", &s.imo)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_pair.id, "scr-1");
    }

    #[tokio::test]
    async fn test_duplicate_account_and_imo_is_conflict() {
        let repo = repo().await;
        repo.insert(&screening("scr-1", "acct-1")).await.unwrap();

        let err = repo.insert(&screening("scr-2", "acct-1")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Another account may screen the same ship
        repo.insert(&screening("scr-3", "acct-2")).await.unwrap();
        let ids = repo
            .find_ids_by_imo(&Imo::parse("9074729").unwrap())
            .await
            .unwrap();
        assert_eq!(ids, vec!["scr-1".to_string(), "scr-3".to_string()]);
    }

    #[tokio::test]
    async fn test_apply_check_persists_transition() {
        let repo = repo().await;
        repo.insert(&screening("scr-1", "acct-1")).await.unwrap();
        schedule(&repo, "scr-1", NOW).await;

        let id = "scr-1".to_string();
        let s = repo
            .apply_check(&id, NOW, CheckKind::ShipFlag, CheckTransition::Start, NOW + 1)
            .await
            .unwrap();
        assert_eq!(s.status, ScreeningStatus::InProgress);

        let outcome = CheckOutcome::new(Severity::Warning, serde_json::json!({"flag": "RU"}));
        repo.apply_check(
            &id,
            NOW,
            CheckKind::ShipFlag,
            CheckTransition::Complete(outcome),
            NOW + 2,
        )
        .await
        .unwrap();

        let loaded = repo.find_by_id(&id).await.unwrap().unwrap();
        let check = loaded.check(CheckKind::ShipFlag).unwrap();
        assert_eq!(check.status, ScreeningStatus::Done);
        assert_eq!(check.severity, Some(Severity::Warning));
        assert_eq!(check.result.as_ref().unwrap()["flag"], "RU");
        assert_eq!(loaded.severity, Some(Severity::Warning));
    }

    #[tokio::test]
    async fn test_invalid_transition_is_rejected_and_not_saved() {
        let repo = repo().await;
        repo.insert(&screening("scr-1", "acct-1")).await.unwrap();

        schedule(&repo, "scr-1", NOW).await;
        repo.force_complete(&"scr-1".to_string(), NOW + 1).await.unwrap();

        // Closed by the killer: nothing may start
        let err = repo
            .apply_check(
                &"scr-1".to_string(),
                NOW,
                CheckKind::ShipFlag,
                CheckTransition::Start,
                NOW,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InvalidStateTransition { .. })
        ));

        let loaded = repo.find_by_id(&"scr-1".to_string()).await.unwrap().unwrap();
        assert_eq!(loaded.status, ScreeningStatus::Done);
        assert_eq!(
            loaded.check(CheckKind::ShipFlag).unwrap().severity,
            Some(Severity::Unknown)
        );
    }

    #[tokio::test]
    async fn test_transition_from_replaced_run_is_rejected() {
        let repo = repo().await;
        repo.insert(&screening("scr-1", "acct-1")).await.unwrap();
        schedule(&repo, "scr-1", NOW).await;
        schedule(&repo, "scr-1", NOW + 10).await;

        let id = "scr-1".to_string();
        let outcome = CheckOutcome::new(Severity::Critical, serde_json::json!({"flag": "IR"}));
        let err = repo
            .apply_check(
                &id,
                NOW,
                CheckKind::ShipFlag,
                CheckTransition::Complete(outcome),
                NOW + 20,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::StaleRun { .. })));

        let loaded = repo.find_by_id(&id).await.unwrap().unwrap();
        let check = loaded.check(CheckKind::ShipFlag).unwrap();
        assert_eq!(check.status, ScreeningStatus::Scheduled);
        assert_eq!(check.severity, None);

        repo.apply_check(&id, NOW + 10, CheckKind::ShipFlag, CheckTransition::Start, NOW + 21)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_screening_is_not_found() {
        let repo = repo().await;
        let err = repo
            .force_complete(&"nope".to_string(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stale_and_stuck_queries() {
        let repo = repo().await;
        repo.insert(&screening("created", "a")).await.unwrap();
        repo.insert(&screening("running", "b")).await.unwrap();
        repo.insert(&screening("done", "c")).await.unwrap();

        schedule(&repo, "running", NOW).await;
        schedule(&repo, "done", NOW).await;
        let (done, forced) = repo.force_complete(&"done".to_string(), NOW + 10).await.unwrap();
        assert_eq!(forced, CheckKind::ALL.len());
        assert_eq!(done.status, ScreeningStatus::Done);

        let stale = repo.find_stale_ids(NOW, 100).await.unwrap();
        assert_eq!(stale, vec!["created".to_string()]);
        let stale = repo.find_stale_ids(NOW + 10, 100).await.unwrap();
        assert_eq!(stale.len(), 2);

        let stuck = repo.find_stuck_ids(NOW + 1, 100).await.unwrap();
        assert_eq!(stuck, vec!["running".to_string()]);
        assert!(repo.find_stuck_ids(NOW, 100).await.unwrap().is_empty());

        assert_eq!(repo.count_by_status(ScreeningStatus::Done).await.unwrap(), 1);
        assert_eq!(repo.count_by_status(ScreeningStatus::Scheduled).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_history_written_on_reschedule_newest_first() {
        let repo = repo().await;
        let id = "scr-1".to_string();
        repo.insert(&screening("scr-1", "acct-1")).await.unwrap();

        schedule(&repo, "scr-1", NOW).await;
        repo.force_complete(&id, NOW + 1).await.unwrap();
        schedule(&repo, "scr-1", NOW + 2).await;
        repo.force_complete(&id, NOW + 3).await.unwrap();
        schedule(&repo, "scr-1", NOW + 4).await;

        let history = repo.history(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].recorded_at, NOW + 4);
        assert_eq!(history[0].completed_at, Some(NOW + 3));
        assert_eq!(history[1].recorded_at, NOW + 2);
        assert_eq!(history[0].severity, Some(Severity::Unknown));
        assert_eq!(history[0].checks.len(), CheckKind::ALL.len());
    }
}
