use std::collections::HashSet;

use chrono::Utc;
use tracing::info;

use super::{CacheError, DataCache};
use crate::models::Notification;
use crate::notifications::reconcile::{cancel_reminder, create_reminder};
use crate::notifications::{reconcile, ReconcileOutcome, ReminderPolicy};
use crate::schema::fields::Notifications;

impl DataCache {
    /// Lead time from the options, shifted by the active time-travel offset.
    pub fn reminder_policy(&self) -> ReminderPolicy {
        ReminderPolicy {
            lead: self.options().reminder_lead,
            time_offset: self.settings().time_offset(),
        }
    }

    pub fn has_reminder(&self, event_id: &str) -> bool {
        self.notifications().iter().any(|n| n.record_id == event_id)
    }

    /// Remind the user of `event_id`, replacing any earlier reminder for it.
    pub async fn add_event_reminder(&self, event_id: &str) -> Result<Notification, CacheError> {
        let _reminders = self.reminders.lock().await;
        let event = self
            .events()
            .get(event_id)
            .cloned()
            .ok_or_else(|| CacheError::UnknownRecord(event_id.to_string()))?;

        for existing in self.notifications().iter().filter(|n| n.record_id == event_id) {
            cancel_reminder(existing, self.scheduler.as_ref()).await;
        }
        let (notification, _) =
            create_reminder(&event, self.scheduler.as_ref(), &self.reminder_policy(), Utc::now()).await;

        let added = notification.clone();
        self.update_value::<Notifications>(move |current| {
            current
                .iter()
                .filter(|n| n.record_id != event_id)
                .cloned()
                .chain(std::iter::once(added))
                .collect()
        })
        .await?;
        info!(event_id = event_id, scheduled = notification.identifier.is_some(), "Reminder added");
        Ok(notification)
    }

    /// Drop the reminder for `event_id`. Returns whether there was one.
    pub async fn remove_event_reminder(&self, event_id: &str) -> Result<bool, CacheError> {
        let _reminders = self.reminders.lock().await;
        let matching: Vec<Notification> = self
            .notifications()
            .into_iter()
            .filter(|n| n.record_id == event_id)
            .collect();
        if matching.is_empty() {
            return Ok(false);
        }
        for existing in &matching {
            cancel_reminder(existing, self.scheduler.as_ref()).await;
        }
        self.update_value::<Notifications>(|current| {
            current
                .iter()
                .filter(|n| n.record_id != event_id)
                .cloned()
                .collect()
        })
        .await?;
        info!(event_id = event_id, "Reminder removed");
        Ok(true)
    }

    /// Reconcile stored reminders against the cached events and persist the
    /// result when it changed.
    ///
    /// Only the reminders present when reconciling started are replaced;
    /// anything stored since is kept.
    pub async fn reconcile_notifications(&self) -> Result<ReconcileOutcome, CacheError> {
        let _reminders = self.reminders.lock().await;
        let notifications = self.notifications();
        let events = self.events();
        let outcome = reconcile(
            &notifications,
            &events,
            self.scheduler.as_ref(),
            &self.reminder_policy(),
            Utc::now(),
        )
        .await;
        if outcome.changed {
            let handled: HashSet<&str> = notifications.iter().map(|n| n.record_id.as_str()).collect();
            let reconciled = outcome.notifications.clone();
            self.update_value::<Notifications>(move |current| {
                current
                    .iter()
                    .filter(|n| !handled.contains(n.record_id.as_str()))
                    .cloned()
                    .chain(reconciled)
                    .collect()
            })
            .await?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use std::time::Duration as StdDuration;

    use chrono::{DateTime, Duration};
    use serde_json::json;

    use super::*;
    use crate::cache::CacheOptions;
    use crate::schema::fields::Settings;
    use crate::storage::MemoryStorage;
    use crate::testing::{RecordingScheduler, SchedulerCall, ScriptedSource};

    async fn cache_with_event(scheduler: Arc<RecordingScheduler>) -> Arc<DataCache> {
        let now = Utc::now();
        let source = Arc::new(ScriptedSource::new());
        source.respond(
            "Events",
            json!([{
                "Id": "e1",
                "LastChangeDateTimeUtc": now - Duration::days(1),
                "Title": "Fursuit Parade",
                "StartDateTimeUtc": now + Duration::days(1),
            }]),
        );
        let cache = DataCache::new(
            CacheOptions::new("ef29"),
            Arc::new(MemoryStorage::new()),
            source,
            scheduler,
        );
        cache.initialize().await.unwrap();
        cache.synchronize().await.unwrap();
        cache
    }

    #[tokio::test]
    async fn test_add_and_remove_reminder() {
        let scheduler = Arc::new(RecordingScheduler::new());
        let cache = cache_with_event(scheduler.clone()).await;

        let added = cache.add_event_reminder("e1").await.unwrap();
        assert!(cache.has_reminder("e1"));
        let identifier = added.identifier.clone().unwrap();
        assert!(identifier.starts_with("event-reminder:e1:"));
        assert!(matches!(&scheduler.calls()[0], SchedulerCall::Schedule(req) if req.title == "Fursuit Parade"));

        assert!(cache.remove_event_reminder("e1").await.unwrap());
        assert!(!cache.has_reminder("e1"));
        assert_eq!(scheduler.calls()[1], SchedulerCall::Cancel(identifier));
        assert!(!cache.remove_event_reminder("e1").await.unwrap());
    }

    #[tokio::test]
    async fn test_adding_twice_keeps_one_reminder() {
        let scheduler = Arc::new(RecordingScheduler::new());
        let cache = cache_with_event(scheduler.clone()).await;

        cache.add_event_reminder("e1").await.unwrap();
        cache.add_event_reminder("e1").await.unwrap();

        assert_eq!(cache.notifications().len(), 1);
        assert_eq!(scheduler.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_reminder_added_during_reconcile_is_kept() {
        let now = Utc::now();
        let scheduler = Arc::new(RecordingScheduler::new().with_cancel_delay(StdDuration::from_millis(200)));
        let source = Arc::new(ScriptedSource::new());
        let events = |e1_changed: DateTime<Utc>| {
            json!([
                {
                    "Id": "e1",
                    "LastChangeDateTimeUtc": e1_changed,
                    "Title": "Fursuit Parade",
                    "StartDateTimeUtc": now + Duration::days(1),
                },
                {
                    "Id": "e2",
                    "LastChangeDateTimeUtc": now - Duration::days(1),
                    "Title": "Dance Competition",
                    "StartDateTimeUtc": now + Duration::days(2),
                },
            ])
        };
        source.respond("Events", events(now - Duration::days(1)));
        let cache = DataCache::new(
            CacheOptions::new("ef29"),
            Arc::new(MemoryStorage::new()),
            source.clone(),
            scheduler.clone(),
        );
        cache.initialize().await.unwrap();
        cache.synchronize().await.unwrap();
        cache.add_event_reminder("e1").await.unwrap();

        // e1 changed, so the next sync cancels its reminder slowly
        source.respond("Events", events(now + Duration::minutes(5)));
        let syncing = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.synchronize().await })
        };
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        let added = cache.add_event_reminder("e2").await.unwrap();
        syncing.await.unwrap().unwrap();

        let notifications = cache.notifications();
        assert_eq!(notifications.len(), 2);
        assert!(notifications.contains(&added));
        assert!(cache.has_reminder("e1"));
    }

    #[tokio::test]
    async fn test_unknown_event_is_rejected() {
        let cache = cache_with_event(Arc::new(RecordingScheduler::new())).await;
        let result = cache.add_event_reminder("nope").await;
        assert!(matches!(result, Err(CacheError::UnknownRecord(_))));
    }

    #[tokio::test]
    async fn test_policy_follows_time_travel() {
        let cache = cache_with_event(Arc::new(RecordingScheduler::new())).await;
        cache
            .update_value::<Settings>(|settings| {
                let mut settings = settings.clone();
                settings.time_travel_enabled = true;
                settings.time_travel_offset = 3_600_000;
                settings
            })
            .await
            .unwrap();

        let policy = cache.reminder_policy();
        assert_eq!(policy.lead, Duration::minutes(30));
        assert_eq!(policy.time_offset, Duration::hours(1));
    }
}
