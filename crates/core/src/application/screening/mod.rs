// Screening use cases: create, inspect and (re)schedule screenings

mod scheduler;
pub mod validate;

pub use scheduler::{check_subject_key, CheckJobPayload, ScreeningScheduler};

use crate::domain::{HistoryEntry, Imo, Screening, ScreeningId};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, ScreeningRepository, ShipRepository, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};
use validate::{parse_imo, validate_account_id};

pub struct ScreeningService {
    screenings: Arc<dyn ScreeningRepository>,
    ships: Arc<dyn ShipRepository>,
    scheduler: Arc<ScreeningScheduler>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl ScreeningService {
    pub fn new(
        screenings: Arc<dyn ScreeningRepository>,
        ships: Arc<dyn ShipRepository>,
        scheduler: Arc<ScreeningScheduler>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            screenings,
            ships,
            scheduler,
            id_provider,
            time_provider,
        }
    }

    /// Create a screening of a known ship for an account and schedule it.
    ///
    /// # Errors
    /// - `Validation` for a bad account id or IMO
    /// - `NotFound` when the ship has no master data
    /// - `Conflict` when the account already screens the ship
    pub async fn create(&self, account_id: &str, imo: &str) -> Result<Screening> {
        validate_account_id(account_id)?;
        let imo = parse_imo(imo)?;
        self.require_ship(&imo).await?;

        if self
            .screenings
            .find_by_account_and_imo(account_id, &imo)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "account {} already screens {}",
                account_id, imo
            )));
        }

        let screening = self.insert(account_id, imo).await?;
        self.scheduler.schedule(&screening.id).await
    }

    /// Find the account's screening of a ship, creating it when missing,
    /// and schedule it. The ship must exist.
    pub async fn ensure_scheduled(&self, account_id: &str, imo: &Imo) -> Result<Screening> {
        let existing = self
            .screenings
            .find_by_account_and_imo(account_id, imo)
            .await?;

        let id = match existing {
            Some(screening) => screening.id,
            None => match self.insert(account_id, imo.clone()).await {
                Ok(screening) => screening.id,
                // Lost a race with a concurrent create for the same pair
                Err(AppError::Conflict(_)) => self
                    .screenings
                    .find_by_account_and_imo(account_id, imo)
                    .await?
                    .map(|s| s.id)
                    .ok_or_else(|| {
                        AppError::Internal(format!("screening of {} vanished", imo))
                    })?,
                Err(e) => return Err(e),
            },
        };

        self.scheduler.schedule(&id).await
    }

    pub async fn get(&self, id: &ScreeningId) -> Result<Screening> {
        self.screenings
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("screening {}", id)))
    }

    /// History snapshots of a screening, newest first
    pub async fn history(&self, id: &ScreeningId) -> Result<Vec<HistoryEntry>> {
        self.get(id).await?;
        self.screenings.history(id).await
    }

    /// Re-run every check of a screening now
    pub async fn schedule(&self, id: &ScreeningId) -> Result<Screening> {
        self.scheduler.schedule(id).await
    }

    /// Schedule every screening of a ship. Returns how many were scheduled.
    pub async fn rescreen_ship(&self, imo: &Imo) -> Result<usize> {
        let ids = self.screenings.find_ids_by_imo(imo).await?;
        let mut scheduled = 0;

        for id in &ids {
            match self.scheduler.schedule(id).await {
                Ok(_) => scheduled += 1,
                // Deleted between listing and scheduling
                Err(AppError::NotFound(_)) => {
                    warn!(screening_id = %id, "Screening disappeared before rescreen")
                }
                Err(e) => return Err(e),
            }
        }

        info!(imo = %imo, scheduled, "Ship rescreened");
        Ok(scheduled)
    }

    async fn require_ship(&self, imo: &Imo) -> Result<()> {
        match self.ships.find_by_imo(imo).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("ship {}", imo))),
        }
    }

    async fn insert(&self, account_id: &str, imo: Imo) -> Result<Screening> {
        let screening = Screening::new(
            self.id_provider.generate_id(),
            account_id,
            imo,
            self.time_provider.now_millis(),
        );
        self.screenings.insert(&screening).await?;
        info!(
            screening_id = %screening.id,
            account_id = %account_id,
            imo = %screening.imo,
            "Screening created"
        );
        Ok(screening)
    }
}
