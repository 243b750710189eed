// Application Layer - Use Cases and Business Logic

pub mod bulk;
pub mod cached_sources;
pub mod check_task;
pub mod checks;
pub mod killer;
pub mod maintenance;
pub mod periodic;
pub mod recovery;
pub mod retry;
pub mod screening;
pub mod ship;
pub mod staleness;
pub mod worker;

// Re-exports
pub use bulk::{BulkScreeningService, BulkSummary};
pub use cached_sources::{CacheSettings, CachedSources};
pub use check_task::CheckTaskHandler;
pub use checks::CheckRunner;
pub use killer::ScreeningKiller;
pub use maintenance::MaintenanceScheduler;
pub use periodic::{PeriodicTasks, SweepReport};
pub use recovery::{RecoveryReport, RecoveryService};
pub use retry::{RetryDecision, RetryPolicy};
pub use screening::{CheckJobPayload, ScreeningScheduler, ScreeningService};
pub use ship::{ShipService, UpsertOutcome};
pub use staleness::StalenessSweep;
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker};
