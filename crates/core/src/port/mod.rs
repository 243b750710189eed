// Port Layer - Interfaces for external dependencies

pub mod bulk_repository;
pub mod cache;
pub mod id_provider; // For deterministic testing
pub mod job_handler;
pub mod job_repository;
pub mod maintenance;
pub mod screening_repository;
pub mod ship_repository;
pub mod sources;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use bulk_repository::BulkScreeningRepository;
pub use cache::{CacheEntry, DistributedLock, ProviderCache};
pub use id_provider::IdProvider;
pub use job_handler::{HandlerError, JobHandler};
pub use job_repository::JobRepository;
pub use maintenance::{Maintenance, MaintenanceConfig, MaintenanceReport, MaintenanceStats};
pub use screening_repository::ScreeningRepository;
pub use ship_repository::ShipRepository;
pub use sources::{
    Inspection, InspectionsSource, MovementsSource, PortCall, ProviderError, SanctionHit,
    SanctionsSource, ZoneVisit,
};
pub use time_provider::TimeProvider;
pub use transaction::{SchedulingTransaction, Transaction, TransactionalScreeningRepository};
