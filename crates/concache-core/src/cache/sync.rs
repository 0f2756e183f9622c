//! Synchronization with the remote API.
//!
//! All entity collections are fetched concurrently. Each successful fetch
//! replaces its collection wholesale; a failed fetch keeps the cached copy.
//! Overlapping calls to [`DataCache::synchronize`] share one run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::manager::lock;
use super::writer::PendingWrite;
use super::{DataCache, SyncError};
use crate::api::ApiError;
use crate::schema::fields::{
    Announcements, ArtistAlley, Communications, Dealers, EventDays, EventRooms, EventTracks,
    Events, Images, KnowledgeEntries, KnowledgeGroups, LastSyncAuthorized, LastSynchronised, Maps,
};
use crate::schema::{EntityField, Field};
use crate::store::EntityStore;

pub(crate) type SharedSync = Shared<BoxFuture<'static, Result<SyncReport, SyncError>>>;

type Fetched<F> = Option<Result<Vec<<F as EntityField>::Record>, ApiError>>;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub field: &'static str,
    pub message: String,
    pub unauthorized: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    /// Collections replaced by this run
    pub updated: Vec<&'static str>,
    /// Authenticated collections not attempted for lack of credentials
    pub skipped: Vec<&'static str>,
    pub failures: Vec<FetchFailure>,
    /// Writes that did not reach storage; memory is still up to date
    pub persist_failures: usize,
    pub notifications_changed: bool,
    pub scheduler_failures: usize,
}

/// Keeps `is_synchronizing` raised for as long as it lives.
struct SyncFlag<'a>(&'a AtomicBool);

impl<'a> SyncFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for SyncFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl DataCache {
    /// Fetch every collection and merge the results into the cache, then
    /// reconcile event reminders.
    ///
    /// A call made while another is running joins it and gets the same
    /// result. Fails with [`SyncError::Unauthorized`] when the server
    /// rejected the credentials; everything else that could be fetched has
    /// been merged by then.
    pub async fn synchronize(self: &Arc<Self>) -> Result<SyncReport, SyncError> {
        let shared = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.as_ref() {
                Some(running) => {
                    debug!("Joining running synchronization");
                    running.clone()
                }
                None => {
                    let this = Arc::clone(self);
                    let task = tokio::spawn(async move {
                        let result = this.run_synchronize().await;
                        *lock(&this.in_flight) = None;
                        result
                    });
                    let shared = task
                        .map(|joined| {
                            joined.unwrap_or_else(|e| Err(SyncError::TaskFailed(e.to_string())))
                        })
                        .boxed()
                        .shared();
                    *in_flight = Some(shared.clone());
                    shared
                }
            }
        };
        shared.await
    }

    async fn run_synchronize(&self) -> Result<SyncReport, SyncError> {
        if !self.is_ready() {
            return Err(SyncError::NotReady);
        }
        let _flag = SyncFlag::raise(&self.synchronizing);
        let started_at = Utc::now();
        let authenticated = self.source.is_authenticated();
        info!(authenticated, "Synchronization started");

        let (
            events,
            event_days,
            event_rooms,
            event_tracks,
            dealers,
            announcements,
            images,
            maps,
            knowledge_groups,
            knowledge_entries,
            artist_alley,
            communications,
        ) = tokio::join!(
            self.fetch::<Events>(authenticated),
            self.fetch::<EventDays>(authenticated),
            self.fetch::<EventRooms>(authenticated),
            self.fetch::<EventTracks>(authenticated),
            self.fetch::<Dealers>(authenticated),
            self.fetch::<Announcements>(authenticated),
            self.fetch::<Images>(authenticated),
            self.fetch::<Maps>(authenticated),
            self.fetch::<KnowledgeGroups>(authenticated),
            self.fetch::<KnowledgeEntries>(authenticated),
            self.fetch::<ArtistAlley>(authenticated),
            self.fetch::<Communications>(authenticated),
        );

        let mut report = SyncReport {
            started_at,
            ..Default::default()
        };
        let mut writes = Vec::new();
        self.merge::<Events>(events, &mut report, &mut writes);
        self.merge::<EventDays>(event_days, &mut report, &mut writes);
        self.merge::<EventRooms>(event_rooms, &mut report, &mut writes);
        self.merge::<EventTracks>(event_tracks, &mut report, &mut writes);
        self.merge::<Dealers>(dealers, &mut report, &mut writes);
        self.merge::<Announcements>(announcements, &mut report, &mut writes);
        self.merge::<Images>(images, &mut report, &mut writes);
        self.merge::<Maps>(maps, &mut report, &mut writes);
        self.merge::<KnowledgeGroups>(knowledge_groups, &mut report, &mut writes);
        self.merge::<KnowledgeEntries>(knowledge_entries, &mut report, &mut writes);
        self.merge::<ArtistAlley>(artist_alley, &mut report, &mut writes);
        self.merge::<Communications>(communications, &mut report, &mut writes);

        if !authenticated && self.get_value::<LastSyncAuthorized>() {
            info!("Signed out since the last sync, clearing private collections");
            writes.push(self.set_value::<Communications>(Communications::default_value()));
        }
        if !report.updated.is_empty() {
            writes.push(self.set_value::<LastSynchronised>(started_at));
            writes.push(self.set_value::<LastSyncAuthorized>(authenticated));
        }

        for result in join_all(writes.into_iter().map(PendingWrite::wait)).await {
            if let Err(e) = result {
                warn!(error = %e, "Synchronized data was not persisted");
                report.persist_failures += 1;
            }
        }

        match self.reconcile_notifications().await {
            Ok(outcome) => {
                report.notifications_changed = outcome.changed;
                report.scheduler_failures = outcome.failures;
            }
            Err(e) => warn!(error = %e, "Failed to reconcile notifications"),
        }

        info!(
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "Synchronization finished"
        );

        if report.failures.iter().any(|failure| failure.unauthorized) {
            return Err(SyncError::Unauthorized);
        }
        Ok(report)
    }

    async fn fetch<F: EntityField>(&self, authenticated: bool) -> Fetched<F> {
        if F::AUTHENTICATED && !authenticated {
            return None;
        }
        let result = self
            .source
            .fetch_collection(F::ENDPOINT, F::AUTHENTICATED)
            .await
            .and_then(|records| {
                serde_json::from_value(Value::Array(records))
                    .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", F::ENDPOINT, e)))
            });
        Some(result)
    }

    fn merge<F: EntityField>(
        &self,
        fetched: Fetched<F>,
        report: &mut SyncReport,
        writes: &mut Vec<PendingWrite>,
    ) {
        match fetched {
            None => report.skipped.push(F::NAME),
            Some(Ok(records)) => {
                debug!(field = F::NAME, count = records.len(), "Merging collection");
                let store = EntityStore::from_records(records);
                writes.push(self.set_value::<F>(F::into_value(store)));
                report.updated.push(F::NAME);
            }
            Some(Err(e)) => {
                error!(field = F::NAME, error = %e, "Fetch failed, keeping cached data");
                report.failures.push(FetchFailure {
                    field: F::NAME,
                    message: e.to_string(),
                    unauthorized: e.is_unauthorized(),
                });
            }
        }
    }
}
