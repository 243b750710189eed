//! Shared wiring for the integration tests
//!
//! Builds the whole pipeline against SQLite with a manual clock and
//! in-memory provider data, the same way the daemon wires it.

#![allow(dead_code)]

use shipscreen_core::application::worker::constants::SCREENING_QUEUE;
use shipscreen_core::application::{
    BulkScreeningService, CacheSettings, CachedSources, CheckRunner, CheckTaskHandler,
    MaintenanceScheduler, PeriodicTasks, RetryPolicy, ScreeningKiller, ScreeningScheduler,
    ScreeningService, ShipService, StalenessSweep, Worker,
};
use shipscreen_core::domain::{
    Company, CompanyRole, Imo, JobState, Screening, ScreeningId, ScreeningPolicy, Ship,
};
use shipscreen_core::port::id_provider::mocks::SequentialIdProvider;
use shipscreen_core::port::sources::mocks::StaticSources;
use shipscreen_core::port::time_provider::mocks::ManualClock;
use shipscreen_core::port::{JobHandler, JobRepository, MaintenanceConfig, ScreeningRepository};
use shipscreen_infra_sqlite::{
    create_pool, run_migrations, SqliteBulkScreeningRepository, SqliteJobRepository, SqliteLock,
    SqliteMaintenance, SqliteProviderCache, SqliteScreeningRepository, SqliteShipRepository,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

pub const START_MS: i64 = 1_700_000_000_000;
pub const SECOND_MS: i64 = 1000;
pub const HOUR_MS: i64 = 60 * 60 * SECOND_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

pub const MAX_ATTEMPTS: i32 = 3;
pub const RETRY_BASE_DELAY_MS: i64 = SECOND_MS;

/// IMO of the default test ship
pub const IMO: &str = "9074729";

pub struct Harness {
    pub pool: SqlitePool,
    pub clock: Arc<ManualClock>,
    pub sources: Arc<StaticSources>,

    pub job_repo: Arc<SqliteJobRepository>,
    pub screening_repo: Arc<SqliteScreeningRepository>,
    pub ship_repo: Arc<SqliteShipRepository>,
    pub maintenance: Arc<SqliteMaintenance>,

    pub scheduler: Arc<ScreeningScheduler>,
    pub screenings: Arc<ScreeningService>,
    pub ships: Arc<ShipService>,
    pub bulk: Arc<BulkScreeningService>,
    pub killer: Arc<ScreeningKiller>,
    pub staleness: Arc<StalenessSweep>,
    pub periodic: PeriodicTasks,
    pub maintenance_scheduler: Arc<MaintenanceScheduler>,

    pub check_handler: Arc<dyn JobHandler>,
    retry_policy: Arc<RetryPolicy>,
    worker: Worker,
}

impl Harness {
    /// Fresh in-memory database with the default policy
    pub async fn new() -> Self {
        Self::build("sqlite::memory:", ScreeningPolicy::default()).await
    }

    pub async fn with_policy(policy: ScreeningPolicy) -> Self {
        Self::build("sqlite::memory:", policy).await
    }

    pub async fn build(database_url: &str, policy: ScreeningPolicy) -> Self {
        let pool = create_pool(database_url).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let clock = Arc::new(ManualClock::new(START_MS));
        let ids = Arc::new(SequentialIdProvider::new("id"));
        let sources = Arc::new(StaticSources::new());

        let job_repo = Arc::new(SqliteJobRepository::new(pool.clone(), clock.clone()));
        let screening_repo = Arc::new(SqliteScreeningRepository::new(pool.clone(), clock.clone()));
        let ship_repo = Arc::new(SqliteShipRepository::new(pool.clone()));
        let bulk_repo = Arc::new(SqliteBulkScreeningRepository::new(pool.clone()));
        let maintenance = Arc::new(SqliteMaintenance::new(pool.clone(), clock.clone()));

        let cached = Arc::new(CachedSources::new(
            sources.clone(),
            sources.clone(),
            sources.clone(),
            Arc::new(SqliteProviderCache::new(pool.clone())),
            Arc::new(SqliteLock::new(pool.clone())),
            ids.clone(),
            clock.clone(),
            CacheSettings::default(),
        ));

        let scheduler = Arc::new(ScreeningScheduler::new(
            screening_repo.clone(),
            ids.clone(),
            clock.clone(),
            MAX_ATTEMPTS,
        ));
        let screenings = Arc::new(ScreeningService::new(
            screening_repo.clone(),
            ship_repo.clone(),
            scheduler.clone(),
            ids.clone(),
            clock.clone(),
        ));
        let ships = Arc::new(ShipService::new(
            ship_repo.clone(),
            screenings.clone(),
            clock.clone(),
        ));
        let bulk = Arc::new(BulkScreeningService::new(
            bulk_repo,
            ship_repo.clone(),
            screenings.clone(),
            ids,
            clock.clone(),
        ));

        let runner = Arc::new(CheckRunner::new(
            cached.clone(),
            cached.clone(),
            cached,
            Arc::new(policy),
            clock.clone(),
        ));
        let check_handler: Arc<dyn JobHandler> = Arc::new(CheckTaskHandler::new(
            screening_repo.clone(),
            ship_repo.clone(),
            runner,
            clock.clone(),
        ));
        let retry_policy = Arc::new(RetryPolicy::new(clock.clone(), RETRY_BASE_DELAY_MS));

        let killer = Arc::new(ScreeningKiller::new(
            screening_repo.clone(),
            clock.clone(),
            None,
        ));
        let staleness = Arc::new(StalenessSweep::new(
            screening_repo.clone(),
            scheduler.clone(),
            clock.clone(),
            None,
        ));
        let periodic = PeriodicTasks::new(
            killer.clone(),
            staleness.clone(),
            bulk.clone(),
            Duration::from_secs(60),
        );
        let maintenance_scheduler = Arc::new(MaintenanceScheduler::new(
            maintenance.clone(),
            MaintenanceConfig::default(),
            24,
        ));

        let worker = Worker::new(
            SCREENING_QUEUE,
            job_repo.clone(),
            vec![check_handler.clone()],
            retry_policy.clone(),
            clock.clone(),
        );

        Self {
            pool,
            clock,
            sources,
            job_repo,
            screening_repo,
            ship_repo,
            maintenance,
            scheduler,
            screenings,
            ships,
            bulk,
            killer,
            staleness,
            periodic,
            maintenance_scheduler,
            check_handler,
            retry_policy,
            worker,
        }
    }

    /// Another worker on the screening queue sharing this harness's services
    pub fn worker(&self) -> Worker {
        Worker::new(
            SCREENING_QUEUE,
            self.job_repo.clone(),
            vec![self.check_handler.clone()],
            self.retry_policy.clone(),
            self.clock.clone(),
        )
    }

    /// Run jobs until none is runnable at the current clock. Returns how many ran.
    pub async fn drain(&self) -> usize {
        let mut processed = 0;
        while self.worker.process_next_job().await.unwrap() {
            processed += 1;
        }
        processed
    }

    pub async fn add_ship(&self, ship: Ship) {
        self.ships.upsert(ship).await.unwrap();
    }

    pub async fn screening(&self, id: &ScreeningId) -> Screening {
        self.screening_repo.find_by_id(id).await.unwrap().unwrap()
    }

    pub async fn jobs(&self, state: JobState) -> i64 {
        self.job_repo
            .count_by_state(SCREENING_QUEUE, state)
            .await
            .unwrap()
    }
}

/// Ship with a registered owner and an operator, both in unremarkable countries
pub fn sample_ship(imo: &str) -> Ship {
    let mut ship = Ship::new(Imo::parse(imo).unwrap(), "NORDIC STAR", 0);
    ship.flag = Some("PA".to_string());
    ship.companies.insert(
        CompanyRole::RegisteredOwner,
        Company {
            name: "Nordic Holdings".to_string(),
            country: Some("NO".to_string()),
        },
    );
    ship.companies.insert(
        CompanyRole::Operator,
        Company {
            name: "Blue Ocean Shipping".to_string(),
            country: Some("GR".to_string()),
        },
    );
    ship
}

/// Valid IMO number for a six-digit prefix
pub fn imo_for(prefix: u32) -> String {
    let digits = format!("{:06}", prefix % 1_000_000);
    let sum: u32 = digits
        .chars()
        .zip((2..=7).rev())
        .map(|(c, weight)| c.to_digit(10).unwrap_or(0) * weight)
        .sum();
    format!("{}{}", digits, sum % 10)
}
