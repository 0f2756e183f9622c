//! The offline data cache.
//!
//! [`DataCache`] owns the in-memory copy of every schema field. It hydrates
//! from a [`StorageBackend`](crate::storage::StorageBackend), persists
//! writes in the background, synchronizes entity collections from a
//! [`RemoteSource`](crate::api::RemoteSource) and keeps event reminders in
//! step with the synchronized events.

pub mod error;
pub mod manager;
pub mod reminders;
pub mod sync;
pub mod writer;

pub use error::{CacheError, SyncError};
pub use manager::{CacheOptions, CacheSummary, DataCache, Lifecycle, CACHE_VERSION, DEFAULT_REMINDER_LEAD_MINUTES};
pub use sync::{FetchFailure, SyncReport};
pub use writer::PendingWrite;
