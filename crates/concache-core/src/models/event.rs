use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::impl_record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventRecord {
    pub id: String,
    pub last_change_date_time_utc: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<String>,
    #[serde(rename = "Abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    pub start_date_time_utc: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date_time_utc: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference_day_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference_room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference_track_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_record!(EventRecord, search: [title, sub_title, abstract_text]);

impl EventRecord {
    /// Title with the subtitle appended when present
    pub fn full_title(&self) -> String {
        match self.sub_title.as_deref().filter(|s| !s.is_empty()) {
            Some(sub) => format!("{} - {}", self.title, sub),
            None => self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventDayRecord {
    pub id: String,
    pub last_change_date_time_utc: DateTime<Utc>,
    #[serde(default)]
    pub name: String,
    /// ISO date, so lexical order is chronological
    #[serde(default)]
    pub date: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_record!(EventDayRecord, search: [name]);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventRoomRecord {
    pub id: String,
    pub last_change_date_time_utc: DateTime<Utc>,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_record!(EventRoomRecord, search: [name]);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventTrackRecord {
    pub id: String,
    pub last_change_date_time_utc: DateTime<Utc>,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_record!(EventTrackRecord, search: [name]);
