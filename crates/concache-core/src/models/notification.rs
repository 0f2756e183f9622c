use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    EventReminder,
}

/// A reminder the app has (or meant to have) scheduled on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Id of the related entity record
    pub record_id: String,
    /// Scheduler handle; absent when nothing was scheduled on the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub date_created_utc: DateTime<Utc>,
    pub date_scheduled_utc: DateTime<Utc>,
}

impl Notification {
    /// Identifier for an event reminder created at `created`.
    ///
    /// Contains the record id, so reminders for different events never
    /// share an identifier, and the creation instant, so a replacement never
    /// reuses the identifier of the reminder it supersedes.
    pub fn reminder_identifier(record_id: &str, created: DateTime<Utc>) -> String {
        format!("event-reminder:{}:{}", record_id, created.timestamp_millis())
    }
}
