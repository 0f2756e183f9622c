use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::impl_record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DealerRecord {
    pub id: String,
    pub last_change_date_time_utc: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee_nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about_the_artist_text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_record!(
    DealerRecord,
    search: [display_name, attendee_nickname, short_description, about_the_artist_text]
);

impl DealerRecord {
    /// Display name, falling back to the attendee nickname
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.attendee_nickname.as_deref())
            .unwrap_or_default()
    }
}
