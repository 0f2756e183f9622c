//! Event reminders and their reconciliation with device-scheduled
//! notifications.
//!
//! The cache keeps a list of [`Notification`](crate::models::Notification)
//! records; the [`NotificationScheduler`] owns the real device reminders.
//! After every sync, [`reconcile`] brings the two back in line with the
//! current events.

pub mod reconcile;
pub mod scheduler;

pub use reconcile::{reconcile, ReconcileOutcome, ReminderPolicy};
pub use scheduler::{NoopScheduler, NotificationScheduler, ReminderRequest, SchedulerError};
