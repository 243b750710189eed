// Transaction port for atomic scheduling

use crate::domain::{HistoryEntry, Job, Screening, ScreeningId};
use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Entry point for scheduling transactions
#[async_trait]
pub trait TransactionalScreeningRepository: Send + Sync {
    /// Begin a new transaction
    async fn begin_transaction(&self) -> Result<Box<dyn SchedulingTransaction>>;
}

/// Operations needed to (re)schedule a screening atomically
#[async_trait]
pub trait SchedulingTransaction: Transaction {
    /// Load a screening and take the write lock on it (`SELECT .. FOR UPDATE`)
    async fn lock_screening(&mut self, id: &ScreeningId) -> Result<Option<Screening>>;

    /// Persist screening row and all its checks
    async fn save_screening(&mut self, screening: &Screening) -> Result<()>;

    /// Append a history snapshot
    async fn insert_history(&mut self, entry: &HistoryEntry) -> Result<()>;

    /// Get latest generation (within transaction)
    async fn get_latest_generation(&mut self, subject_key: &str) -> Result<i64>;

    /// Insert job (within transaction)
    async fn insert_job(&mut self, job: &Job) -> Result<()>;

    /// Mark queued jobs of older generations superseded (within transaction)
    async fn mark_superseded(&mut self, subject_key: &str, below_generation: i64) -> Result<u64>;
}
