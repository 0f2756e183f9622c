use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::impl_record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnnouncementRecord {
    pub id: String,
    pub last_change_date_time_utc: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    pub valid_from_date_time_utc: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until_date_time_utc: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_record!(AnnouncementRecord, search: [title, content]);

impl AnnouncementRecord {
    /// Whether the announcement should be shown at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.valid_from_date_time_utc <= now
            && self.valid_until_date_time_utc.map_or(true, |until| now < until)
    }
}
