// Bulk screening: accept many IMOs at once, resolve them in the background

use crate::application::screening::validate::validate_account_id;
use crate::application::screening::ScreeningService;
use crate::application::worker::constants::{BULK_CONCURRENCY, MAX_BULK_IMOS};
use crate::domain::{BulkScreening, BulkScreeningId, BulkScreeningStatus, Imo};
use crate::error::{AppError, Result};
use crate::port::{BulkScreeningRepository, IdProvider, ShipRepository, TimeProvider};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info};

/// Counts of one processing pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BulkSummary {
    pub done: usize,
    pub invalid_imo: usize,
    pub not_found: usize,
    /// Rows left SCHEDULED for the next pass
    pub failed: usize,
}

impl BulkSummary {
    pub fn processed(&self) -> usize {
        self.done + self.invalid_imo + self.not_found
    }

    fn record(&mut self, status: BulkScreeningStatus) {
        match status {
            BulkScreeningStatus::Done => self.done += 1,
            BulkScreeningStatus::InvalidImo => self.invalid_imo += 1,
            BulkScreeningStatus::NotFound => self.not_found += 1,
            BulkScreeningStatus::Scheduled => self.failed += 1,
        }
    }
}

pub struct BulkScreeningService {
    bulk_repo: Arc<dyn BulkScreeningRepository>,
    ships: Arc<dyn ShipRepository>,
    screening_service: Arc<ScreeningService>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl BulkScreeningService {
    pub fn new(
        bulk_repo: Arc<dyn BulkScreeningRepository>,
        ships: Arc<dyn ShipRepository>,
        screening_service: Arc<ScreeningService>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            bulk_repo,
            ships,
            screening_service,
            id_provider,
            time_provider,
        }
    }

    /// Record one SCHEDULED row per IMO. IMOs are validated later, so a bad
    /// number ends up as an INVALID_IMO row rather than failing the request.
    pub async fn create(&self, account_id: &str, imos: &[String]) -> Result<Vec<BulkScreeningId>> {
        validate_account_id(account_id)?;
        if imos.is_empty() {
            return Err(AppError::Validation("imos cannot be empty".to_string()));
        }
        if imos.len() > MAX_BULK_IMOS {
            return Err(AppError::Validation(format!(
                "too many imos: {} (max {})",
                imos.len(),
                MAX_BULK_IMOS
            )));
        }

        let now = self.time_provider.now_millis();
        let rows: Vec<BulkScreening> = imos
            .iter()
            .map(|imo| BulkScreening::new(self.id_provider.generate_id(), account_id, imo, now))
            .collect();

        self.bulk_repo.insert_many(&rows).await?;
        info!(account_id = %account_id, rows = rows.len(), "Bulk screening accepted");

        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    pub async fn get(&self, id: &BulkScreeningId) -> Result<BulkScreening> {
        self.bulk_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("bulk screening {}", id)))
    }

    /// Resolve up to `limit` pending rows
    pub async fn process_pending(&self, limit: i64) -> Result<BulkSummary> {
        let rows = self.bulk_repo.find_pending(limit).await?;
        if rows.is_empty() {
            return Ok(BulkSummary::default());
        }

        let statuses: Vec<BulkScreeningStatus> = stream::iter(rows)
            .map(|row| self.process_row(row))
            .buffer_unordered(BULK_CONCURRENCY)
            .collect()
            .await;

        let mut summary = BulkSummary::default();
        for status in statuses {
            summary.record(status);
        }

        info!(
            done = summary.done,
            invalid_imo = summary.invalid_imo,
            not_found = summary.not_found,
            failed = summary.failed,
            "Bulk screenings processed"
        );
        Ok(summary)
    }

    /// Returns the row's new status; SCHEDULED when it must be retried
    async fn process_row(&self, mut row: BulkScreening) -> BulkScreeningStatus {
        match self.resolve(&mut row).await {
            Ok(()) => row.status,
            Err(e) => {
                error!(bulk_id = %row.id, imo = %row.imo, error = %e, "Bulk row failed");
                BulkScreeningStatus::Scheduled
            }
        }
    }

    async fn resolve(&self, row: &mut BulkScreening) -> Result<()> {
        let now = self.time_provider.now_millis();

        match Imo::parse(&row.imo) {
            Err(_) => row.reject(BulkScreeningStatus::InvalidImo, now),
            Ok(imo) => {
                if self.ships.find_by_imo(&imo).await?.is_none() {
                    row.reject(BulkScreeningStatus::NotFound, now);
                } else {
                    let screening = self
                        .screening_service
                        .ensure_scheduled(&row.account_id, &imo)
                        .await?;
                    row.resolve(screening.id, now);
                }
            }
        }

        self.bulk_repo.update(row).await
    }
}
