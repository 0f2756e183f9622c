use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

/// User settings persisted under the `settings` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    /// Absent until the user hides their first event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_events: Option<Vec<String>>,
    pub favorite_dealers: Vec<String>,
    pub dev_menu: bool,
    /// Time-travel offset in milliseconds, only applied while enabled
    pub time_travel_offset: i64,
    pub time_travel_enabled: bool,
}

impl AppSettings {
    /// The active time-travel offset, zero when disabled
    pub fn time_offset(&self) -> Duration {
        if self.time_travel_enabled {
            Duration::milliseconds(self.time_travel_offset)
        } else {
            Duration::zero()
        }
    }

    pub fn is_event_hidden(&self, event_id: &str) -> bool {
        self.hidden_events
            .as_ref()
            .is_some_and(|hidden| hidden.iter().any(|id| id == event_id))
    }

    /// Copy of the settings with `event_id` appended to the hidden list
    pub fn with_hidden_event(&self, event_id: &str) -> Self {
        let mut next = self.clone();
        let hidden = next.hidden_events.get_or_insert_with(Vec::new);
        if !hidden.iter().any(|id| id == event_id) {
            hidden.push(event_id.to_string());
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_omits_hidden_events() {
        let json = serde_json::to_string(&AppSettings::default()).unwrap();
        assert!(!json.contains("hiddenEvents"));
        let back: AppSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AppSettings::default());
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: AppSettings = serde_json::from_str(r#"{"theme":"dark"}"#).unwrap();
        assert_eq!(settings.theme, Some(Theme::Dark));
        assert!(settings.hidden_events.is_none());
        assert!(!settings.dev_menu);
    }

    #[test]
    fn test_time_offset_only_when_enabled() {
        let mut settings = AppSettings {
            time_travel_offset: 3_600_000,
            ..Default::default()
        };
        assert_eq!(settings.time_offset(), Duration::zero());
        settings.time_travel_enabled = true;
        assert_eq!(settings.time_offset(), Duration::hours(1));
    }

    #[test]
    fn test_with_hidden_event_dedupes() {
        let settings = AppSettings::default()
            .with_hidden_event("evt-1")
            .with_hidden_event("evt-1");
        assert_eq!(settings.hidden_events, Some(vec!["evt-1".to_string()]));
        assert!(settings.is_event_hidden("evt-1"));
        assert!(!settings.is_event_hidden("evt-2"));
    }
}
