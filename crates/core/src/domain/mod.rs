// Domain Layer - Pure business logic and entities

pub mod bulk;
pub mod check;
pub mod error;
pub mod imo;
pub mod job;
pub mod policy;
pub mod screening;
pub mod severity;
pub mod ship;

// Re-exports
pub use bulk::{BulkScreening, BulkScreeningId, BulkScreeningStatus};
pub use check::{CheckKind, CheckOutcome, CheckRule, CheckState, CompanyRole};
pub use error::DomainError;
pub use imo::Imo;
pub use job::{Generation, Job, JobId, JobPayload, JobState, JobType, SubjectKey};
pub use policy::ScreeningPolicy;
pub use screening::{CheckTransition, HistoryEntry, Screening, ScreeningId, TIMED_OUT_REASON};
pub use severity::{ScreeningStatus, Severity, SeverityChange};
pub use ship::{Company, Ship};
