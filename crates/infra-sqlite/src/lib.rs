// Shipscreen Infrastructure - SQLite Adapter
// Implements: JobRepository, ScreeningRepository, TransactionalScreeningRepository,
// ShipRepository, BulkScreeningRepository, ProviderCache, DistributedLock, Maintenance

mod bulk_repository;
mod cache;
mod connection;
mod error;
mod job_repository;
mod maintenance_impl;
mod migration;
mod screening_repository;
mod screening_rows;
mod ship_repository;
mod transaction;

pub use bulk_repository::SqliteBulkScreeningRepository;
pub use cache::{SqliteLock, SqliteProviderCache};
pub use connection::create_pool;
pub use job_repository::SqliteJobRepository;
pub use maintenance_impl::SqliteMaintenance;
pub use migration::run_migrations;
pub use screening_repository::SqliteScreeningRepository;
pub use ship_repository::SqliteShipRepository;
pub use transaction::SqliteSchedulingTransaction;

// Note: sqlx::Error conversion is handled by `error::map_sqlx_error`
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
