//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::api::{ApiError, RemoteSource};
use crate::models::EventRecord;
use crate::notifications::{NotificationScheduler, ReminderRequest, SchedulerError};

pub fn event(id: &str, last_change: DateTime<Utc>, start: DateTime<Utc>) -> EventRecord {
    EventRecord {
        id: id.to_string(),
        last_change_date_time_utc: last_change,
        title: format!("Event {id}"),
        sub_title: None,
        abstract_text: None,
        start_date_time_utc: start,
        end_date_time_utc: None,
        conference_day_id: None,
        conference_room_id: None,
        conference_track_id: None,
        extra: Map::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerCall {
    Schedule(ReminderRequest),
    Cancel(String),
}

/// Scheduler that records every call and hands back the requested
/// identifier as the handle.
pub struct RecordingScheduler {
    calls: Mutex<Vec<SchedulerCall>>,
    failing_cancels: HashSet<String>,
    fail_schedule: bool,
    supported: bool,
    cancel_delay: Option<StdDuration>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing_cancels: HashSet::new(),
            fail_schedule: false,
            supported: true,
            cancel_delay: None,
        }
    }

    pub fn failing_cancel(mut self, identifier: &str) -> Self {
        self.failing_cancels.insert(identifier.to_string());
        self
    }

    pub fn failing_schedule(mut self) -> Self {
        self.fail_schedule = true;
        self
    }

    /// Make every cancel take `delay` before it returns
    pub fn with_cancel_delay(mut self, delay: StdDuration) -> Self {
        self.cancel_delay = Some(delay);
        self
    }

    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    pub fn calls(&self) -> Vec<SchedulerCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationScheduler for RecordingScheduler {
    fn supports_scheduling(&self) -> bool {
        self.supported
    }

    async fn schedule(&self, request: &ReminderRequest) -> Result<String, SchedulerError> {
        self.calls
            .lock()
            .unwrap()
            .push(SchedulerCall::Schedule(request.clone()));
        if self.fail_schedule {
            return Err(SchedulerError::Failed("schedule refused".to_string()));
        }
        Ok(request.identifier.clone())
    }

    async fn cancel(&self, identifier: &str) -> Result<(), SchedulerError> {
        self.calls
            .lock()
            .unwrap()
            .push(SchedulerCall::Cancel(identifier.to_string()));
        if let Some(delay) = self.cancel_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_cancels.contains(identifier) {
            return Err(SchedulerError::Failed("cancel refused".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Records(Vec<Value>),
    Unauthorized,
    ServerError,
}

/// Remote source answering from a script. Unscripted endpoints return an
/// empty collection.
pub struct ScriptedSource {
    responses: Mutex<HashMap<String, Scripted>>,
    fetches: Mutex<HashMap<String, usize>>,
    authenticated: Mutex<bool>,
    delay: Option<StdDuration>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            fetches: Mutex::new(HashMap::new()),
            authenticated: Mutex::new(false),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: StdDuration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn authenticated(self, authenticated: bool) -> Self {
        self.set_authenticated(authenticated);
        self
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        *self.authenticated.lock().unwrap() = authenticated;
    }

    /// Answer `endpoint` with the records of a JSON array
    pub fn respond(&self, endpoint: &str, records: Value) {
        let records = match records {
            Value::Array(records) => records,
            other => panic!("expected a JSON array, got {other}"),
        };
        self.script(endpoint, Scripted::Records(records));
    }

    pub fn fail(&self, endpoint: &str) {
        self.script(endpoint, Scripted::ServerError);
    }

    pub fn reject(&self, endpoint: &str) {
        self.script(endpoint, Scripted::Unauthorized);
    }

    pub fn fetches_of(&self, endpoint: &str) -> usize {
        self.fetches.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    fn script(&self, endpoint: &str, response: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), response);
    }
}

#[async_trait]
impl RemoteSource for ScriptedSource {
    fn is_authenticated(&self) -> bool {
        *self.authenticated.lock().unwrap()
    }

    async fn fetch_collection(&self, endpoint: &str, _authenticated: bool) -> Result<Vec<Value>, ApiError> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.responses.lock().unwrap().get(endpoint).cloned();
        match response {
            Some(Scripted::Records(records)) => Ok(records),
            Some(Scripted::Unauthorized) => Err(ApiError::Unauthorized),
            Some(Scripted::ServerError) => Err(ApiError::ServerError("scripted failure".to_string())),
            None => Ok(Vec::new()),
        }
    }
}
