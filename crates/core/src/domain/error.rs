// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid state transition for {subject}: {from} -> {to}")]
    InvalidStateTransition {
        subject: String,
        from: String,
        to: String,
    },

    /// The screening was rescheduled since the job was enqueued
    #[error("Run of {screening} scheduled at {expected} was replaced")]
    StaleRun { screening: String, expected: i64 },

    #[error("Invalid IMO number: {0}")]
    InvalidImo(String),

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
