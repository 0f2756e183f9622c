use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::impl_record;

/// A published artist-alley table registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableRegistrationRecord {
    pub id: String,
    pub last_change_date_time_utc: DateTime<Utc>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_record!(TableRegistrationRecord, search: [display_name, short_description]);

/// Locally kept draft of the user's own registration form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtistAlleyDraft {
    pub display_name: String,
    pub website_url: String,
    pub short_description: String,
    pub telegram_handle: String,
    pub location: String,
}
