use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use super::{NotificationScheduler, ReminderRequest};
use crate::models::{EventRecord, Notification, NotificationType};
use crate::store::EntityStore;

/// How far ahead of an event its reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderPolicy {
    pub lead: Duration,
    /// Active time-travel offset; the app's clock runs this far ahead
    pub time_offset: Duration,
}

impl ReminderPolicy {
    pub fn fire_time(&self, event: &EventRecord) -> DateTime<Utc> {
        event.start_date_time_utc - self.lead - self.time_offset
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    pub notifications: Vec<Notification>,
    /// Whether `notifications` differs from the input list
    pub changed: bool,
    pub removed: usize,
    pub replaced: usize,
    /// Scheduler calls that failed; bookkeeping for those may be stale
    pub failures: usize,
}

/// Create the reminder record for `event`, scheduling it on the device when
/// the fire time is still ahead and the platform supports it. Returns the
/// record and whether the scheduler failed.
pub(crate) async fn create_reminder(
    event: &EventRecord,
    scheduler: &dyn NotificationScheduler,
    policy: &ReminderPolicy,
    now: DateTime<Utc>,
) -> (Notification, bool) {
    // Never older than the event change it answers to
    let created = now.max(event.last_change_date_time_utc);
    let fire_at = policy.fire_time(event);
    let mut identifier = None;
    let mut failed = false;

    if fire_at > now && scheduler.supports_scheduling() {
        let request = ReminderRequest {
            identifier: Notification::reminder_identifier(&event.id, created),
            record_id: event.id.clone(),
            title: event.full_title(),
            fire_at,
        };
        match scheduler.schedule(&request).await {
            Ok(handle) => identifier = Some(handle),
            Err(e) => {
                warn!(record_id = %event.id, error = %e, "Failed to schedule reminder");
                failed = true;
            }
        }
    }

    let notification = Notification {
        record_id: event.id.clone(),
        identifier,
        kind: NotificationType::EventReminder,
        date_created_utc: created,
        date_scheduled_utc: fire_at,
    };
    (notification, failed)
}

/// Cancel the device reminder behind `notification`, if there is one.
/// Returns false when the scheduler failed.
pub(crate) async fn cancel_reminder(
    notification: &Notification,
    scheduler: &dyn NotificationScheduler,
) -> bool {
    let Some(identifier) = notification.identifier.as_deref() else {
        return true;
    };
    match scheduler.cancel(identifier).await {
        Ok(()) => true,
        Err(e) => {
            warn!(identifier = identifier, error = %e, "Failed to cancel reminder");
            false
        }
    }
}

/// Bring `notifications` in line with the current `events`.
///
/// Reminders whose event is gone are cancelled and dropped. Reminders whose
/// event changed after the reminder was created are cancelled and replaced.
/// Everything else is left alone, so a second run without event changes
/// makes no scheduler calls.
pub async fn reconcile(
    notifications: &[Notification],
    events: &EntityStore<EventRecord>,
    scheduler: &dyn NotificationScheduler,
    policy: &ReminderPolicy,
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();

    for notification in notifications {
        let Some(event) = events.get(&notification.record_id) else {
            debug!(record_id = %notification.record_id, "Dropping reminder for deleted event");
            if !cancel_reminder(notification, scheduler).await {
                outcome.failures += 1;
            }
            outcome.removed += 1;
            outcome.changed = true;
            continue;
        };

        if event.last_change_date_time_utc > notification.date_created_utc {
            debug!(record_id = %notification.record_id, "Replacing reminder for changed event");
            if !cancel_reminder(notification, scheduler).await {
                outcome.failures += 1;
            }
            let (replacement, failed) = create_reminder(event, scheduler, policy, now).await;
            if failed {
                outcome.failures += 1;
            }
            outcome.notifications.push(replacement);
            outcome.replaced += 1;
            outcome.changed = true;
        } else {
            outcome.notifications.push(notification.clone());
        }
    }

    outcome
}
