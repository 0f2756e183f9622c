use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Local notifications are not supported on this platform")]
    Unsupported,

    #[error("Scheduler failed: {0}")]
    Failed(String),
}

/// A reminder to put on the device.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRequest {
    pub identifier: String,
    pub record_id: String,
    pub title: String,
    pub fire_at: DateTime<Utc>,
}

/// Device notification primitives. Reconciliation and the reminder
/// operations on the cache are the only callers.
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    fn supports_scheduling(&self) -> bool;

    /// Schedule a reminder, returning the handle to cancel it with.
    async fn schedule(&self, request: &ReminderRequest) -> Result<String, SchedulerError>;

    async fn cancel(&self, identifier: &str) -> Result<(), SchedulerError>;
}

/// Scheduler for platforms without local notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScheduler;

#[async_trait]
impl NotificationScheduler for NoopScheduler {
    fn supports_scheduling(&self) -> bool {
        false
    }

    async fn schedule(&self, _request: &ReminderRequest) -> Result<String, SchedulerError> {
        Err(SchedulerError::Unsupported)
    }

    async fn cancel(&self, _identifier: &str) -> Result<(), SchedulerError> {
        Ok(())
    }
}
