use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::impl_record;

/// A private message addressed to the signed-in attendee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommunicationRecord {
    pub id: String,
    pub last_change_date_time_utc: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    pub created_date_time_utc: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_date_time_utc: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_record!(CommunicationRecord, search: [author_name, subject, message]);

impl CommunicationRecord {
    pub fn is_read(&self) -> bool {
        self.read_date_time_utc.is_some()
    }
}
