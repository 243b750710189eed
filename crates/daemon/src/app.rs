//! Composition root: builds every adapter and service from the configuration

use crate::config::DaemonConfig;
use anyhow::{Context, Result};
use shipscreen_api_rpc::{RateLimiter, RpcHandler, RpcServer, RpcServerConfig, RpcServices};
use shipscreen_core::application::worker::constants::SCREENING_QUEUE;
use shipscreen_core::application::{
    BulkScreeningService, CachedSources, CheckRunner, CheckTaskHandler, MaintenanceScheduler,
    PeriodicTasks, RecoveryService, RetryPolicy, ScreeningKiller, ScreeningScheduler,
    ScreeningService, ShipService, StalenessSweep, Worker,
};
use shipscreen_core::port::id_provider::UuidProvider;
use shipscreen_core::port::time_provider::SystemTimeProvider;
use shipscreen_core::port::{IdProvider, JobHandler, TimeProvider};
use shipscreen_infra_providers::{HttpProviderClient, ProviderSettings};
use shipscreen_infra_sqlite::{
    create_pool, run_migrations, SqliteBulkScreeningRepository, SqliteJobRepository, SqliteLock,
    SqliteMaintenance, SqliteProviderCache, SqliteScreeningRepository, SqliteShipRepository,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct App {
    pub workers: Vec<Worker>,
    pub recovery: RecoveryService,
    pub periodic: PeriodicTasks,
    pub maintenance: Arc<MaintenanceScheduler>,
    pub rpc: RpcServer,
}

impl App {
    pub async fn build(config: &DaemonConfig) -> Result<Self> {
        let db_path = config.database_path();
        if let Some(parent) = Path::new(&db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        tracing::info!(db_path = %db_path, "Initializing database...");
        let pool = create_pool(&db_path)
            .await
            .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
        run_migrations(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

        let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
        let id_provider: Arc<dyn IdProvider> = Arc::new(UuidProvider);

        // Repositories
        let job_repo = Arc::new(SqliteJobRepository::new(pool.clone(), time_provider.clone()));
        let screening_repo = Arc::new(SqliteScreeningRepository::new(
            pool.clone(),
            time_provider.clone(),
        ));
        let ship_repo = Arc::new(SqliteShipRepository::new(pool.clone()));
        let bulk_repo = Arc::new(SqliteBulkScreeningRepository::new(pool.clone()));
        let maintenance = Arc::new(SqliteMaintenance::new(pool.clone(), time_provider.clone()));

        // Providers behind the shared cache
        let client = Arc::new(
            HttpProviderClient::new(ProviderSettings {
                base_url: config.providers.base_url.clone(),
                api_key: config.providers.api_key.clone(),
                timeout: Duration::from_secs(config.providers.timeout_secs),
            })
            .map_err(|e| anyhow::anyhow!("Provider client setup failed: {}", e))?,
        );
        if config.providers.api_key.is_empty() {
            tracing::warn!("providers.api_key is empty; provider calls will likely be rejected");
        }
        let sources = Arc::new(CachedSources::new(
            client.clone(),
            client.clone(),
            client,
            Arc::new(SqliteProviderCache::new(pool.clone())),
            Arc::new(SqliteLock::new(pool)),
            id_provider.clone(),
            time_provider.clone(),
            config.screening.cache_settings(),
        ));

        // Services
        let scheduler = Arc::new(ScreeningScheduler::new(
            screening_repo.clone(),
            id_provider.clone(),
            time_provider.clone(),
            config.worker.max_attempts,
        ));
        let screening_service = Arc::new(ScreeningService::new(
            screening_repo.clone(),
            ship_repo.clone(),
            scheduler.clone(),
            id_provider.clone(),
            time_provider.clone(),
        ));
        let ship_service = Arc::new(ShipService::new(
            ship_repo.clone(),
            screening_service.clone(),
            time_provider.clone(),
        ));
        let bulk_service = Arc::new(BulkScreeningService::new(
            bulk_repo,
            ship_repo.clone(),
            screening_service.clone(),
            id_provider,
            time_provider.clone(),
        ));

        let runner = Arc::new(CheckRunner::new(
            sources.clone(),
            sources.clone(),
            sources,
            Arc::new(config.policy.clone()),
            time_provider.clone(),
        ));
        let check_handler: Arc<dyn JobHandler> = Arc::new(CheckTaskHandler::new(
            screening_repo.clone(),
            ship_repo,
            runner,
            time_provider.clone(),
        ));
        let retry_policy = Arc::new(RetryPolicy::new(
            time_provider.clone(),
            config.worker.retry_base_delay_ms,
        ));

        let workers = (0..config.worker.count)
            .map(|_| {
                Worker::new(
                    SCREENING_QUEUE,
                    job_repo.clone(),
                    vec![check_handler.clone()],
                    retry_policy.clone(),
                    time_provider.clone(),
                )
            })
            .collect();

        let recovery = RecoveryService::new(job_repo.clone(), time_provider.clone());

        let periodic = PeriodicTasks::new(
            Arc::new(ScreeningKiller::new(
                screening_repo.clone(),
                time_provider.clone(),
                Some(config.screening.kill_after_ms()),
            )),
            Arc::new(StalenessSweep::new(
                screening_repo.clone(),
                scheduler,
                time_provider,
                Some(config.screening.rescreen_interval_ms()),
            )),
            bulk_service.clone(),
            config.screening.sweep_interval(),
        );

        let maintenance_scheduler = Arc::new(MaintenanceScheduler::new(
            maintenance.clone(),
            config.maintenance.to_config(),
            config.maintenance.interval_hours,
        ));

        let handler = RpcHandler::new(
            RpcServices {
                screenings: screening_service,
                ships: ship_service,
                bulk: bulk_service,
                screening_repo,
                job_repo,
                maintenance,
                maintenance_scheduler: maintenance_scheduler.clone(),
            },
            RateLimiter::new(config.rpc.rate_limit_burst, config.rpc.rate_limit_per_sec),
        );
        let rpc = RpcServer::new(
            RpcServerConfig {
                host: config.rpc.host.clone(),
                port: config.rpc.port,
            },
            handler,
        );

        Ok(Self {
            workers,
            recovery,
            periodic,
            maintenance: maintenance_scheduler,
            rpc,
        })
    }
}
