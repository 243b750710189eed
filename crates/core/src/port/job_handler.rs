// Job Handler Port
// Abstraction for the work a job type performs

use crate::domain::Job;
use crate::error::AppError;
use crate::port::ProviderError;
use async_trait::async_trait;
use thiserror::Error;

/// Handler errors, split by whether the worker should retry
#[derive(Error, Debug, Clone)]
pub enum HandlerError {
    #[error("Retryable: {0}")]
    Retryable(String),

    #[error("Fatal: {0}")]
    Fatal(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl HandlerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, HandlerError::Retryable(_))
    }
}

impl From<ProviderError> for HandlerError {
    fn from(err: ProviderError) -> Self {
        if err.is_retryable() {
            HandlerError::Retryable(err.to_string())
        } else {
            HandlerError::Fatal(err.to_string())
        }
    }
}

impl From<AppError> for HandlerError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Provider(e) => e.into(),
            // Lock contention and I/O hiccups clear up on their own
            AppError::Database(msg) => HandlerError::Retryable(msg),
            other => HandlerError::Fatal(other.to_string()),
        }
    }
}

/// Work performed for one job type
///
/// Implementations:
/// - CheckTaskHandler: runs one screening check
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Job type this handler serves
    fn job_type(&self) -> &'static str;

    /// Execute a job
    ///
    /// # Errors
    /// - HandlerError::Retryable when a later attempt may succeed
    /// - HandlerError::Fatal / InvalidPayload otherwise
    async fn handle(&self, job: &Job) -> Result<(), HandlerError>;

    /// Called once when the worker stops retrying a job
    async fn give_up(&self, _job: &Job, _error: &HandlerError) -> Result<(), AppError> {
        Ok(())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock handler behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with a retryable error
        Retry(String),
        /// Always fail with a fatal error
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Mock Job Handler for testing
    pub struct MockJobHandler {
        job_type: &'static str,
        behavior: Arc<Mutex<MockBehavior>>,
        call_count: Arc<Mutex<usize>>,
        give_ups: Arc<Mutex<usize>>,
    }

    impl MockJobHandler {
        pub fn new(job_type: &'static str, behavior: MockBehavior) -> Self {
            Self {
                job_type,
                behavior: Arc::new(Mutex::new(behavior)),
                call_count: Arc::new(Mutex::new(0)),
                give_ups: Arc::new(Mutex::new(0)),
            }
        }

        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }

        pub fn give_up_count(&self) -> usize {
            *self.give_ups.lock().unwrap()
        }
    }

    #[async_trait]
    impl JobHandler for MockJobHandler {
        fn job_type(&self) -> &'static str {
            self.job_type
        }

        async fn handle(&self, _job: &Job) -> Result<(), HandlerError> {
            *self.call_count.lock().unwrap() += 1;

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Retry(msg) => Err(HandlerError::Retryable(msg)),
                MockBehavior::Fail(msg) => Err(HandlerError::Fatal(msg)),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
            }
        }

        async fn give_up(&self, _job: &Job, _error: &HandlerError) -> Result<(), AppError> {
            *self.give_ups.lock().unwrap() += 1;
            Ok(())
        }
    }
}
