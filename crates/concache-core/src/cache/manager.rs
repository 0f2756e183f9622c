use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::sync::SharedSync;
use super::writer::{run_writer, PendingWrite, WriteRequest};
use super::CacheError;
use crate::api::RemoteSource;
use crate::models::{
    AnnouncementRecord, AppSettings, CommunicationRecord, DealerRecord, EventDayRecord,
    EventRecord, EventRoomRecord, EventTrackRecord, ImageRecord, KnowledgeEntryRecord,
    KnowledgeGroupRecord, MapRecord, Notification, TableRegistrationRecord,
};
use crate::notifications::NotificationScheduler;
use crate::schema::fields::{
    Announcements, ArtistAlley, CacheVersion, Cid, Communications, Dealers, EventDays,
    EventRooms, EventTracks, Events, Images, KnowledgeEntries, KnowledgeGroups,
    LastSyncAuthorized, LastSynchronised, Maps, Notifications, Settings,
};
use crate::schema::{self, visit_all, Field, FieldKind, FieldVisitor};
use crate::store::EntityStore;

/// Bump when the persisted layout changes; older caches are discarded.
pub const CACHE_VERSION: u32 = 1;

pub const DEFAULT_REMINDER_LEAD_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Convention the cache belongs to; a mismatch with storage resets it
    pub convention_id: String,
    pub cache_version: u32,
    /// How long before an event its reminder fires
    pub reminder_lead: Duration,
}

impl CacheOptions {
    pub fn new(convention_id: impl Into<String>) -> Self {
        Self {
            convention_id: convention_id.into(),
            cache_version: CACHE_VERSION,
            reminder_lead: Duration::minutes(DEFAULT_REMINDER_LEAD_MINUTES),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Hydrating,
    Ready,
    Disposed,
}

/// Figures for a status overview of the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSummary {
    pub active_announcements: usize,
    pub unread_communications: usize,
    /// Most recent change among the cached events
    pub latest_event_change: Option<DateTime<Utc>>,
}

type Slot = Arc<dyn Any + Send + Sync>;

struct State {
    lifecycle: Lifecycle,
    values: HashMap<&'static str, Slot>,
}

/// Offline store for everything the app shows.
///
/// Values live in memory once [`initialize`](Self::initialize) has hydrated
/// them from storage. Reads are synchronous. Writes update memory at once and
/// reach storage through a background writer, in call order.
pub struct DataCache {
    options: CacheOptions,
    storage: Arc<dyn crate::storage::StorageBackend>,
    pub(super) source: Arc<dyn RemoteSource>,
    pub(super) scheduler: Arc<dyn NotificationScheduler>,
    state: RwLock<State>,
    writes: Mutex<Option<mpsc::UnboundedSender<WriteRequest>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    pub(super) synchronizing: AtomicBool,
    pub(super) in_flight: Mutex<Option<SharedSync>>,
    init: tokio::sync::Mutex<()>,
    /// Held across scheduler I/O by every reminder mutation
    pub(super) reminders: tokio::sync::Mutex<()>,
}

impl DataCache {
    pub fn new(
        options: CacheOptions,
        storage: Arc<dyn crate::storage::StorageBackend>,
        source: Arc<dyn RemoteSource>,
        scheduler: Arc<dyn NotificationScheduler>,
    ) -> Arc<Self> {
        Arc::new(Self {
            options,
            storage,
            source,
            scheduler,
            state: RwLock::new(State {
                lifecycle: Lifecycle::Uninitialized,
                values: HashMap::new(),
            }),
            writes: Mutex::new(None),
            writer: Mutex::new(None),
            synchronizing: AtomicBool::new(false),
            in_flight: Mutex::new(None),
            init: tokio::sync::Mutex::new(()),
            reminders: tokio::sync::Mutex::new(()),
        })
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.read_state().lifecycle
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle() == Lifecycle::Ready
    }

    pub fn is_synchronizing(&self) -> bool {
        self.synchronizing.load(Ordering::SeqCst)
    }

    /// Hydrate every field from storage and start the writer.
    ///
    /// Unreadable fields fall back to their defaults. When the stored
    /// convention id or cache version differ from the configured ones, all
    /// non-internal fields are reset and persisted. A caller that arrives
    /// while another is hydrating waits for it; once ready this does nothing.
    pub async fn initialize(&self) -> Result<(), CacheError> {
        let _init = self.init.lock().await;
        {
            let mut state = self.write_state();
            match state.lifecycle {
                Lifecycle::Ready => return Ok(()),
                Lifecycle::Disposed => return Err(CacheError::Disposed),
                Lifecycle::Uninitialized | Lifecycle::Hydrating => {
                    state.lifecycle = Lifecycle::Hydrating
                }
            }
        }

        let values = match self.load().await {
            Ok(values) => values,
            Err(e) => {
                self.write_state().lifecycle = Lifecycle::Uninitialized;
                return Err(e);
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(Arc::clone(&self.storage), rx));
        *lock(&self.writes) = Some(tx);
        *lock(&self.writer) = Some(handle);

        let mut state = self.write_state();
        if state.lifecycle == Lifecycle::Disposed {
            // Disposed while hydrating
            drop(lock(&self.writes).take());
            return Err(CacheError::Disposed);
        }
        state.values = values;
        state.lifecycle = Lifecycle::Ready;
        info!(cid = %self.options.convention_id, "Cache ready");
        Ok(())
    }

    async fn load(&self) -> Result<HashMap<&'static str, Slot>, CacheError> {
        // Keys are read one by one so a single bad entry cannot fail the rest
        let names = schema::field_names();
        let reads = join_all(
            names
                .iter()
                .map(|&name| async move { (name, self.storage.get(name).await) }),
        )
        .await;
        let mut unreadable = 0;
        let raw: HashMap<&str, Option<String>> = reads
            .into_iter()
            .map(|(name, read)| {
                let text = read.unwrap_or_else(|e| {
                    warn!(field = name, error = %e, "Failed to read field from storage");
                    unreadable += 1;
                    None
                });
                (name, text)
            })
            .collect();

        let mut hydrator = Hydrator {
            raw: &raw,
            values: HashMap::new(),
            recovered: unreadable,
        };
        visit_all(&mut hydrator);
        let Hydrator {
            mut values,
            recovered,
            ..
        } = hydrator;
        if recovered > 0 {
            warn!(count = recovered, "Some cached fields were unreadable and were reset");
        }

        let stored_cid = slot_value::<Cid>(&values);
        let stored_version = slot_value::<CacheVersion>(&values);
        if stored_cid != self.options.convention_id || stored_version != self.options.cache_version {
            info!(
                stored_cid = %stored_cid,
                stored_version,
                cid = %self.options.convention_id,
                version = self.options.cache_version,
                "Cache invalidated"
            );
            let mut encoded = reset_to_defaults(&mut values)?;
            encoded.push(put::<Cid>(&mut values, self.options.convention_id.clone())?);
            encoded.push(put::<CacheVersion>(&mut values, self.options.cache_version)?);
            encoded.push(put::<LastSynchronised>(&mut values, DateTime::<Utc>::UNIX_EPOCH)?);
            encoded.push(put::<LastSyncAuthorized>(&mut values, false)?);
            let pairs: Vec<(String, String)> = encoded
                .into_iter()
                .map(|(key, text)| (key.to_string(), text))
                .collect();
            self.storage.multi_set(&pairs).await?;
        }

        debug!(fields = values.len(), "Cache hydrated");
        Ok(values)
    }

    /// Stop accepting writes, then wait for queued writes to finish.
    pub async fn dispose(&self) {
        self.write_state().lifecycle = Lifecycle::Disposed;
        drop(lock(&self.writes).take());
        let handle = lock(&self.writer).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cache writer ended abnormally");
            }
        }
        info!("Cache disposed");
    }

    /// Current value of `F`. Before the cache is ready this is the default.
    pub fn get_value<F: Field>(&self) -> F::Value {
        let state = self.read_state();
        slot_value::<F>(&state.values)
    }

    /// Replace the value of `F` in memory and queue it for persistence.
    pub fn set_value<F: Field>(&self, value: F::Value) -> PendingWrite {
        self.update_value::<F>(|_| value)
    }

    /// Replace the value of `F` with `f(current)`, atomically with respect
    /// to other writers.
    pub fn update_value<F: Field>(&self, f: impl FnOnce(&F::Value) -> F::Value) -> PendingWrite {
        let mut state = self.write_state();
        match state.lifecycle {
            Lifecycle::Ready => {}
            Lifecycle::Disposed => return PendingWrite::failed(CacheError::Disposed),
            Lifecycle::Uninitialized | Lifecycle::Hydrating => {
                return PendingWrite::failed(CacheError::NotReady)
            }
        }
        let current = slot_value::<F>(&state.values);
        let value = F::normalize(f(&current));
        let text = match encode::<F>(&value) {
            Ok(text) => text,
            Err(e) => return PendingWrite::failed(e),
        };
        state.values.insert(F::NAME, Arc::new(value));
        // Queue while still holding the state lock so storage order matches memory order
        self.enqueue(F::NAME, text)
    }

    fn enqueue(&self, key: &'static str, value: String) -> PendingWrite {
        let (done, rx) = tokio::sync::oneshot::channel();
        let writes = lock(&self.writes);
        match writes.as_ref() {
            Some(tx) => match tx.send(WriteRequest { key, value, done }) {
                Ok(()) => PendingWrite::queued(rx),
                Err(_) => PendingWrite::failed(CacheError::Disposed),
            },
            None => PendingWrite::failed(CacheError::NotReady),
        }
    }

    /// The persisted text of the field called `name`.
    pub fn raw_value(&self, name: &str) -> Result<String, CacheError> {
        struct Dehydrate<'a> {
            name: &'a str,
            values: &'a HashMap<&'static str, Slot>,
            out: Option<Result<String, CacheError>>,
        }

        impl FieldVisitor for Dehydrate<'_> {
            fn visit<F: Field>(&mut self) {
                if F::NAME == self.name {
                    self.out = Some(encode::<F>(&slot_value::<F>(self.values)));
                }
            }
        }

        let state = self.read_state();
        let mut visitor = Dehydrate {
            name,
            values: &state.values,
            out: None,
        };
        visit_all(&mut visitor);
        visitor
            .out
            .unwrap_or_else(|| Err(CacheError::UnknownField(name.to_string())))
    }

    /// Reset every value and entity field to its default and persist the
    /// result. Internal bookkeeping survives except the sync markers.
    pub async fn reset(&self) -> Result<(), CacheError> {
        let pending = {
            let mut state = self.write_state();
            if state.lifecycle != Lifecycle::Ready {
                return Err(CacheError::NotReady);
            }
            let mut encoded = reset_to_defaults(&mut state.values)?;
            encoded.push(put::<LastSynchronised>(&mut state.values, DateTime::<Utc>::UNIX_EPOCH)?);
            encoded.push(put::<LastSyncAuthorized>(&mut state.values, false)?);
            encoded
                .into_iter()
                .map(|(key, text)| self.enqueue(key, text))
                .collect::<Vec<_>>()
        };
        info!("Cache reset");
        for write in pending {
            write.await?;
        }
        Ok(())
    }

    pub fn last_synchronised(&self) -> Option<DateTime<Utc>> {
        let at = self.get_value::<LastSynchronised>();
        (at != DateTime::<Utc>::UNIX_EPOCH).then_some(at)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> CacheSummary {
        CacheSummary {
            active_announcements: self.announcements().iter().filter(|a| a.is_active(now)).count(),
            unread_communications: self.communications().iter().filter(|c| !c.is_read()).count(),
            latest_event_change: self.events().last_change(),
        }
    }

    pub fn settings(&self) -> AppSettings {
        self.get_value::<Settings>()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.get_value::<Notifications>()
    }

    /// Add `event_id` to the hidden events.
    pub fn hide_event(&self, event_id: &str) -> PendingWrite {
        self.update_value::<Settings>(|settings| settings.with_hidden_event(event_id))
    }

    pub fn events(&self) -> EntityStore<EventRecord> {
        self.get_value::<Events>()
    }

    pub fn event_days(&self) -> EntityStore<EventDayRecord> {
        self.get_value::<EventDays>()
    }

    pub fn event_rooms(&self) -> EntityStore<EventRoomRecord> {
        self.get_value::<EventRooms>()
    }

    pub fn event_tracks(&self) -> EntityStore<EventTrackRecord> {
        self.get_value::<EventTracks>()
    }

    pub fn dealers(&self) -> EntityStore<DealerRecord> {
        self.get_value::<Dealers>()
    }

    pub fn announcements(&self) -> EntityStore<AnnouncementRecord> {
        self.get_value::<Announcements>()
    }

    pub fn images(&self) -> EntityStore<ImageRecord> {
        self.get_value::<Images>()
    }

    pub fn maps(&self) -> EntityStore<MapRecord> {
        self.get_value::<Maps>()
    }

    pub fn knowledge_groups(&self) -> EntityStore<KnowledgeGroupRecord> {
        self.get_value::<KnowledgeGroups>()
    }

    pub fn knowledge_entries(&self) -> EntityStore<KnowledgeEntryRecord> {
        self.get_value::<KnowledgeEntries>()
    }

    pub fn artist_alley(&self) -> EntityStore<TableRegistrationRecord> {
        self.get_value::<ArtistAlley>()
    }

    pub fn communications(&self) -> EntityStore<CommunicationRecord> {
        self.get_value::<Communications>()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(super) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn slot_value<F: Field>(values: &HashMap<&'static str, Slot>) -> F::Value {
    values
        .get(F::NAME)
        .and_then(|slot| slot.downcast_ref::<F::Value>())
        .cloned()
        .unwrap_or_else(F::default_value)
}

fn put<F: Field>(
    values: &mut HashMap<&'static str, Slot>,
    value: F::Value,
) -> Result<(&'static str, String), CacheError> {
    let text = encode::<F>(&value)?;
    values.insert(F::NAME, Arc::new(value));
    Ok((F::NAME, text))
}

fn encode<F: Field>(value: &F::Value) -> Result<String, CacheError> {
    F::dehydrate(value).map_err(|source| CacheError::Codec {
        field: F::NAME,
        source,
    })
}

struct Hydrator<'a> {
    raw: &'a HashMap<&'a str, Option<String>>,
    values: HashMap<&'static str, Slot>,
    recovered: usize,
}

impl FieldVisitor for Hydrator<'_> {
    fn visit<F: Field>(&mut self) {
        let value = match self.raw.get(F::NAME).and_then(Option::as_deref) {
            Some(text) => F::hydrate(text).unwrap_or_else(|e| {
                warn!(field = F::NAME, error = %e, "Failed to hydrate field");
                self.recovered += 1;
                F::default_value()
            }),
            None => F::default_value(),
        };
        self.values.insert(F::NAME, Arc::new(value));
    }
}

/// Put the default into every non-internal slot, returning what to persist.
fn reset_to_defaults(
    values: &mut HashMap<&'static str, Slot>,
) -> Result<Vec<(&'static str, String)>, CacheError> {
    struct Reset<'a> {
        values: &'a mut HashMap<&'static str, Slot>,
        encoded: Vec<(&'static str, String)>,
        error: Option<CacheError>,
    }

    impl FieldVisitor for Reset<'_> {
        fn visit<F: Field>(&mut self) {
            if F::KIND == FieldKind::Internal {
                return;
            }
            let value = F::default_value();
            match encode::<F>(&value) {
                Ok(text) => self.encoded.push((F::NAME, text)),
                Err(e) => {
                    self.error.get_or_insert(e);
                }
            }
            self.values.insert(F::NAME, Arc::new(value));
        }
    }

    let mut reset = Reset {
        values,
        encoded: Vec::new(),
        error: None,
    };
    visit_all(&mut reset);
    match reset.error {
        Some(e) => Err(e),
        None => Ok(reset.encoded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtistAlleyDraft;
    use crate::notifications::NoopScheduler;
    use crate::schema::fields::{ArtistAlleyLocal, LastViewTimes};
    use crate::storage::{FileStorage, MemoryStorage, SecureStorage, StorageBackend};
    use crate::testing::ScriptedSource;
    use serde_json::json;
    use tempfile::TempDir;

    fn cache_over(storage: Arc<MemoryStorage>, cid: &str) -> Arc<DataCache> {
        DataCache::new(
            CacheOptions::new(cid),
            storage,
            Arc::new(ScriptedSource::new()),
            Arc::new(NoopScheduler),
        )
    }

    async fn ready_cache(storage: Arc<MemoryStorage>) -> Arc<DataCache> {
        let cache = cache_over(storage, "ef29");
        cache.initialize().await.unwrap();
        cache
    }

    #[tokio::test]
    async fn test_fresh_cache_has_defaults() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ready_cache(storage.clone()).await;

        assert!(cache.is_ready());
        assert!(cache.events().is_empty());
        assert_eq!(cache.settings(), AppSettings::default());
        assert_eq!(cache.get_value::<ArtistAlleyLocal>(), None);
        assert_eq!(cache.last_synchronised(), None);
        // Invalidation wrote the new identity
        assert_eq!(storage.get("cid").await.unwrap().as_deref(), Some("\"ef29\""));
        assert_eq!(storage.get("cacheVersion").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_hidden_events_survive_rehydration() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ready_cache(storage.clone()).await;

        let mut settings = cache.settings();
        settings.hidden_events = Some(vec!["e1".to_string()]);
        cache.set_value::<Settings>(settings.clone()).await.unwrap();
        assert_eq!(cache.settings(), settings);
        cache.dispose().await;

        let reopened = ready_cache(storage).await;
        assert_eq!(reopened.settings().hidden_events, Some(vec!["e1".to_string()]));
        assert!(reopened.settings().is_event_hidden("e1"));
    }

    #[tokio::test]
    async fn test_reads_see_writes_before_persistence() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ready_cache(storage).await;

        let _pending = cache.hide_event("e7");
        assert!(cache.settings().is_event_hidden("e7"));
    }

    #[tokio::test]
    async fn test_update_value_composes() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ready_cache(storage.clone()).await;
        let at = Utc::now();

        let first = cache.update_value::<LastViewTimes>(|times| {
            let mut times = times.clone();
            times.insert("a".to_string(), at);
            times
        });
        let second = cache.update_value::<LastViewTimes>(|times| {
            let mut times = times.clone();
            times.insert("b".to_string(), at);
            times
        });
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(cache.get_value::<LastViewTimes>().len(), 2);
        let stored = storage.get("lastViewTimes").await.unwrap().unwrap();
        assert!(stored.contains("\"a\"") && stored.contains("\"b\""));
    }

    #[tokio::test]
    async fn test_convention_change_invalidates() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ready_cache(storage.clone()).await;
        cache.hide_event("e1").await.unwrap();
        cache.dispose().await;

        let other = cache_over(storage.clone(), "ef30");
        other.initialize().await.unwrap();
        assert_eq!(other.settings(), AppSettings::default());
        assert_eq!(other.get_value::<Cid>(), "ef30");
        assert!(!storage.get("settings").await.unwrap().unwrap().contains("e1"));
    }

    #[tokio::test]
    async fn test_version_change_invalidates() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ready_cache(storage.clone()).await;
        cache.hide_event("e1").await.unwrap();
        cache.dispose().await;

        let mut options = CacheOptions::new("ef29");
        options.cache_version = CACHE_VERSION + 1;
        let upgraded = DataCache::new(
            options,
            storage,
            Arc::new(ScriptedSource::new()),
            Arc::new(NoopScheduler),
        );
        upgraded.initialize().await.unwrap();
        assert!(!upgraded.settings().is_event_hidden("e1"));
        assert_eq!(upgraded.get_value::<CacheVersion>(), CACHE_VERSION + 1);
    }

    #[tokio::test]
    async fn test_unreadable_field_falls_back_to_default() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("cid", "\"ef29\"").await.unwrap();
        storage.set("cacheVersion", "1").await.unwrap();
        storage.set("settings", "{not json").await.unwrap();
        storage
            .set(
                "dealers",
                &json!([{"Id": "d1", "LastChangeDateTimeUtc": "2025-01-01T00:00:00Z", "DisplayName": "Fox"}])
                    .to_string(),
            )
            .await
            .unwrap();

        let cache = ready_cache(storage).await;
        assert_eq!(cache.settings(), AppSettings::default());
        // Valid neighbours still hydrate
        assert_eq!(cache.dealers().len(), 1);
    }

    async fn seed_valid_fields(storage: &dyn StorageBackend) {
        storage.set("cid", "\"ef29\"").await.unwrap();
        storage.set("cacheVersion", "1").await.unwrap();
        storage
            .set(
                "dealers",
                &json!([{"Id": "d1", "LastChangeDateTimeUtc": "2025-01-01T00:00:00Z", "DisplayName": "Fox"}])
                    .to_string(),
            )
            .await
            .unwrap();
    }

    async fn assert_recovers_from_bad_settings(storage: Arc<dyn StorageBackend>) {
        let cache = DataCache::new(
            CacheOptions::new("ef29"),
            storage,
            Arc::new(ScriptedSource::new()),
            Arc::new(NoopScheduler),
        );
        cache.initialize().await.unwrap();
        assert!(cache.is_ready());
        assert_eq!(cache.dealers().len(), 1);
        assert_eq!(cache.settings(), AppSettings::default());
        assert_eq!(cache.get_value::<Cid>(), "ef29");
    }

    #[tokio::test]
    async fn test_non_utf8_file_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap());
        seed_valid_fields(storage.as_ref()).await;
        std::fs::write(dir.path().join("settings.json"), [0xff, 0xfe, 0x00]).unwrap();

        assert_recovers_from_bad_settings(storage).await;
    }

    #[tokio::test]
    async fn test_undecryptable_entry_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(SecureStorage::with_key(dir.path().to_path_buf(), [9; 32]).unwrap());
        seed_valid_fields(storage.as_ref()).await;
        std::fs::write(dir.path().join("settings.sealed"), "not sealed at all").unwrap();

        assert_recovers_from_bad_settings(storage).await;
    }

    #[tokio::test]
    async fn test_concurrent_initialize_waits_for_hydration() {
        let cache = cache_over(Arc::new(MemoryStorage::new()), "ef29");

        let (first, second) = tokio::join!(cache.initialize(), cache.initialize());
        first.unwrap();
        second.unwrap();

        assert!(cache.is_ready());
        cache.hide_event("e1").await.unwrap();
    }

    #[tokio::test]
    async fn test_writes_before_ready_are_rejected() {
        let cache = cache_over(Arc::new(MemoryStorage::new()), "ef29");
        let result = cache.set_value::<Settings>(AppSettings::default()).await;
        assert!(matches!(result, Err(CacheError::NotReady)));
    }

    #[tokio::test]
    async fn test_dispose_flushes_and_stops_writes() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ready_cache(storage.clone()).await;
        let draft = ArtistAlleyDraft {
            display_name: "Studio Fox".to_string(),
            ..Default::default()
        };
        let _ = cache.set_value::<ArtistAlleyLocal>(Some(draft));
        cache.dispose().await;

        assert!(storage
            .get("artistAlleyLocalRegistration")
            .await
            .unwrap()
            .unwrap()
            .contains("Studio Fox"));
        assert_eq!(cache.lifecycle(), Lifecycle::Disposed);
        let result = cache.hide_event("e1").await;
        assert!(matches!(result, Err(CacheError::Disposed)));
        assert!(matches!(cache.initialize().await, Err(CacheError::Disposed)));
    }

    #[tokio::test]
    async fn test_summary() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ready_cache(storage).await;
        let now = Utc::now();
        let empty = cache.summary(now);
        assert_eq!(empty.active_announcements, 0);
        assert_eq!(empty.latest_event_change, None);

        let announcements = json!([
            {"Id": "a1", "LastChangeDateTimeUtc": now, "Title": "Open", "ValidFromDateTimeUtc": now - Duration::hours(1)},
            {"Id": "a2", "LastChangeDateTimeUtc": now, "Title": "Later", "ValidFromDateTimeUtc": now + Duration::hours(1)},
        ]);
        let communications = json!([
            {"Id": "c1", "LastChangeDateTimeUtc": now, "Subject": "Hi", "CreatedDateTimeUtc": now},
            {"Id": "c2", "LastChangeDateTimeUtc": now, "Subject": "Re", "CreatedDateTimeUtc": now, "ReadDateTimeUtc": now},
        ]);
        let changed = now - Duration::hours(2);
        cache
            .set_value::<Announcements>(EntityStore::from_records(
                serde_json::from_value::<Vec<AnnouncementRecord>>(announcements).unwrap(),
            ))
            .await
            .unwrap();
        cache
            .set_value::<Communications>(EntityStore::from_records(
                serde_json::from_value::<Vec<CommunicationRecord>>(communications).unwrap(),
            ))
            .await
            .unwrap();
        cache
            .set_value::<Events>(EntityStore::from_records(vec![
                crate::testing::event("e1", changed - Duration::days(1), now),
                crate::testing::event("e2", changed, now),
            ]))
            .await
            .unwrap();

        let summary = cache.summary(now);
        assert_eq!(summary.active_announcements, 1);
        assert_eq!(summary.unread_communications, 1);
        assert_eq!(summary.latest_event_change, Some(changed));
    }

    #[tokio::test]
    async fn test_raw_value() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ready_cache(storage).await;
        assert_eq!(cache.raw_value("artistAlleyLocalRegistration").unwrap(), "undefined");
        assert_eq!(cache.raw_value("events").unwrap(), "[]");
        assert!(matches!(cache.raw_value("bogus"), Err(CacheError::UnknownField(_))));
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = ready_cache(storage.clone()).await;
        cache.hide_event("e1").await.unwrap();
        cache.set_value::<LastSynchronised>(Utc::now()).await.unwrap();

        cache.reset().await.unwrap();

        assert_eq!(cache.settings(), AppSettings::default());
        assert_eq!(cache.last_synchronised(), None);
        assert_eq!(cache.get_value::<Cid>(), "ef29");
        assert!(!storage.get("settings").await.unwrap().unwrap().contains("e1"));
    }
}
