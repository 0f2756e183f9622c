use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to encode field {field}: {source}")]
    Codec {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cache is not initialized")]
    NotReady,

    #[error("Cache has been disposed")]
    Disposed,

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown record: {0}")]
    UnknownRecord(String),

    #[error("Write was dropped before it completed")]
    WriteDropped,
}

/// Outcome of a failed `synchronize()`. Cloneable so that coalesced callers
/// can all receive it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Cache is not initialized")]
    NotReady,

    #[error("Unauthorized - token missing or expired")]
    Unauthorized,

    #[error("Synchronization task failed: {0}")]
    TaskFailed(String),
}
