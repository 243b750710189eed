//! RPC Method Handlers
//!
//! Each method validates its parameters, delegates to an application
//! service and maps the result to the wire types.

use crate::error::{throttled, to_rpc_error};
use crate::rate_limiter::RateLimiter;
use crate::types::{
    BulkRequest, CreateBulkRequest, CreateBulkResponse, CreateScreeningRequest, HistoryResponse,
    JobCounts, MaintenanceRequest, MaintenanceResponse, ScreeningCounts, ScreeningRequest,
    ScreeningStatusResponse, ShipRequest, StatsRequest, StatsResponse, UpsertShipRequest,
};
use jsonrpsee::types::ErrorObjectOwned;
use shipscreen_core::application::screening::validate::parse_imo;
use shipscreen_core::application::worker::constants::SCREENING_QUEUE;
use shipscreen_core::application::{
    BulkScreeningService, MaintenanceScheduler, ScreeningService, ShipService, UpsertOutcome,
};
use shipscreen_core::domain::{BulkScreening, JobState, Screening, ScreeningStatus, Ship};
use shipscreen_core::error::Result;
use shipscreen_core::port::{JobRepository, Maintenance, ScreeningRepository};
use std::sync::Arc;
use std::time::Instant;

/// Services the RPC surface delegates to
pub struct RpcServices {
    pub screenings: Arc<ScreeningService>,
    pub ships: Arc<ShipService>,
    pub bulk: Arc<BulkScreeningService>,
    pub screening_repo: Arc<dyn ScreeningRepository>,
    pub job_repo: Arc<dyn JobRepository>,
    pub maintenance: Arc<dyn Maintenance>,
    pub maintenance_scheduler: Arc<MaintenanceScheduler>,
}

pub struct RpcHandler {
    services: RpcServices,
    rate_limiter: RateLimiter,
    start_time: Instant,
}

fn status_of(screening: &Screening) -> ScreeningStatusResponse {
    ScreeningStatusResponse {
        screening_id: screening.id.clone(),
        status: screening.status.as_str().to_string(),
    }
}

impl RpcHandler {
    pub fn new(services: RpcServices, rate_limiter: RateLimiter) -> Self {
        Self {
            services,
            rate_limiter,
            start_time: Instant::now(),
        }
    }

    fn admit(&self) -> std::result::Result<(), ErrorObjectOwned> {
        if self.rate_limiter.try_acquire() {
            Ok(())
        } else {
            Err(throttled())
        }
    }

    /// screening.create.v1
    pub async fn create_screening(
        &self,
        params: CreateScreeningRequest,
    ) -> std::result::Result<ScreeningStatusResponse, ErrorObjectOwned> {
        self.admit()?;
        let screening = self
            .services
            .screenings
            .create(&params.account_id, &params.imo)
            .await
            .map_err(to_rpc_error)?;
        Ok(status_of(&screening))
    }

    /// screening.get.v1
    pub async fn get_screening(
        &self,
        params: ScreeningRequest,
    ) -> std::result::Result<Screening, ErrorObjectOwned> {
        self.services
            .screenings
            .get(&params.screening_id)
            .await
            .map_err(to_rpc_error)
    }

    /// screening.schedule.v1
    pub async fn schedule_screening(
        &self,
        params: ScreeningRequest,
    ) -> std::result::Result<ScreeningStatusResponse, ErrorObjectOwned> {
        self.admit()?;
        let screening = self
            .services
            .screenings
            .schedule(&params.screening_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(status_of(&screening))
    }

    /// screening.history.v1
    pub async fn screening_history(
        &self,
        params: ScreeningRequest,
    ) -> std::result::Result<HistoryResponse, ErrorObjectOwned> {
        let entries = self
            .services
            .screenings
            .history(&params.screening_id)
            .await
            .map_err(to_rpc_error)?;
        Ok(HistoryResponse {
            screening_id: params.screening_id,
            entries,
        })
    }

    /// ship.upsert.v1
    pub async fn upsert_ship(
        &self,
        params: UpsertShipRequest,
    ) -> std::result::Result<UpsertOutcome, ErrorObjectOwned> {
        self.admit()?;
        self.services
            .ships
            .upsert(params.ship)
            .await
            .map_err(to_rpc_error)
    }

    /// ship.get.v1
    pub async fn get_ship(&self, params: ShipRequest) -> std::result::Result<Ship, ErrorObjectOwned> {
        let imo = parse_imo(&params.imo).map_err(to_rpc_error)?;
        self.services.ships.get(&imo).await.map_err(to_rpc_error)
    }

    /// bulk.create.v1
    pub async fn create_bulk(
        &self,
        params: CreateBulkRequest,
    ) -> std::result::Result<CreateBulkResponse, ErrorObjectOwned> {
        self.admit()?;
        let bulk_ids = self
            .services
            .bulk
            .create(&params.account_id, &params.imos)
            .await
            .map_err(to_rpc_error)?;
        Ok(CreateBulkResponse { bulk_ids })
    }

    /// bulk.get.v1
    pub async fn get_bulk(
        &self,
        params: BulkRequest,
    ) -> std::result::Result<BulkScreening, ErrorObjectOwned> {
        self.services
            .bulk
            .get(&params.bulk_id)
            .await
            .map_err(to_rpc_error)
    }

    /// admin.stats.v1
    pub async fn stats(
        &self,
        _params: StatsRequest,
    ) -> std::result::Result<StatsResponse, ErrorObjectOwned> {
        self.collect_stats().await.map_err(to_rpc_error)
    }

    async fn collect_stats(&self) -> Result<StatsResponse> {
        let jobs = self.services.job_repo.as_ref();
        let job_count = |state| jobs.count_by_state(SCREENING_QUEUE, state);
        let screenings = self.services.screening_repo.as_ref();

        let db = self.services.maintenance.get_stats().await?;

        Ok(StatsResponse {
            jobs: JobCounts {
                queued: job_count(JobState::Queued).await?,
                running: job_count(JobState::Running).await?,
                done: job_count(JobState::Done).await?,
                failed: job_count(JobState::Failed).await?,
                superseded: job_count(JobState::Superseded).await?,
            },
            screenings: ScreeningCounts {
                created: screenings.count_by_status(ScreeningStatus::Created).await?,
                scheduled: screenings.count_by_status(ScreeningStatus::Scheduled).await?,
                in_progress: screenings
                    .count_by_status(ScreeningStatus::InProgress)
                    .await?,
                done: screenings.count_by_status(ScreeningStatus::Done).await?,
            },
            cache_entries: db.cache_entry_count,
            db_size_bytes: db.db_size_bytes,
            uptime_seconds: self.start_time.elapsed().as_secs() as i64,
        })
    }

    /// admin.maintenance.v1
    pub async fn maintenance(
        &self,
        params: MaintenanceRequest,
    ) -> std::result::Result<MaintenanceResponse, ErrorObjectOwned> {
        self.admit()?;
        let report = self
            .services
            .maintenance_scheduler
            .run_now(params.force_vacuum)
            .await
            .map_err(to_rpc_error)?;

        Ok(MaintenanceResponse {
            vacuum_run: report.vacuum_run,
            jobs_deleted: report.jobs_deleted,
            cache_entries_deleted: report.cache_entries_deleted,
            db_size_before: report.stats_before.db_size_bytes,
            db_size_after: report.stats_after.db_size_bytes,
        })
    }
}
