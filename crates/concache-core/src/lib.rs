//! concache core - an offline cache of convention data.
//!
//! Convention records (events, dealers, announcements, maps, knowledge base,
//! artist alley, private messages) are synchronized from a REST API into a
//! typed, versioned local store, and event reminders scheduled on the device
//! are kept consistent with the synchronized events.
//!
//! The entry point is [`DataCache`]; the persisted fields are declared in
//! [`schema::fields`].

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod json;
pub mod models;
pub mod notifications;
pub mod schema;
pub mod storage;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, RemoteSource};
pub use cache::{CacheError, CacheOptions, DataCache, PendingWrite, SyncError, SyncReport};
pub use config::Config;
pub use notifications::{NoopScheduler, NotificationScheduler};
pub use storage::{StorageBackend, StorageError, StorageKind};
pub use store::{EntityStore, Record};
