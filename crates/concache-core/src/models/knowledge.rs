use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::impl_record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KnowledgeGroupRecord {
    pub id: String,
    pub last_change_date_time_utc: DateTime<Utc>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_record!(KnowledgeGroupRecord, search: [name, description]);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KnowledgeEntryRecord {
    pub id: String,
    pub last_change_date_time_utc: DateTime<Utc>,
    #[serde(default)]
    pub knowledge_group_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub order: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_record!(KnowledgeEntryRecord, search: [title, text]);
