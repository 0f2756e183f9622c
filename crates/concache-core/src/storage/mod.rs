//! Persistent key-value storage for the cache.
//!
//! Every backend implements [`StorageBackend`] and is chosen once at
//! composition time:
//!
//! - [`MemoryStorage`]: process-local map, used in tests and ephemeral runs
//! - [`FileStorage`]: one JSON file per key in the cache directory
//! - [`SecureStorage`]: like `FileStorage`, but every value is sealed with
//!   ChaCha20-Poly1305 under a key kept in the OS keychain
//!
//! Keys are written independently. A failure half way through `multi_set`
//! can leave some keys updated and others not.

pub mod file;
pub mod memory;
pub mod secure;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use secure::SecureStorage;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Keychain error: {0}")]
    Keychain(#[from] keyring::Error),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Read several keys. The result keeps the order of `keys`.
    async fn multi_get(&self, keys: &[&str]) -> Result<Vec<(String, Option<String>)>, StorageError> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push((key.to_string(), self.get(key).await?));
        }
        Ok(out)
    }

    /// Write several keys, stopping at the first failure.
    async fn multi_set(&self, pairs: &[(String, String)]) -> Result<(), StorageError> {
        for (key, value) in pairs {
            self.set(key, value).await?;
        }
        Ok(())
    }
}

/// Which backend the composition root should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Secure,
    File,
    Memory,
}

/// Build the backend for `kind`. `dir` is the cache directory; `service`
/// names the keychain entry of the secure backend.
pub fn open_backend(
    kind: StorageKind,
    dir: PathBuf,
    service: &str,
) -> Result<Arc<dyn StorageBackend>, StorageError> {
    let backend: Arc<dyn StorageBackend> = match kind {
        StorageKind::Secure => Arc::new(SecureStorage::open(dir, service)?),
        StorageKind::File => Arc::new(FileStorage::new(dir)?),
        StorageKind::Memory => Arc::new(MemoryStorage::new()),
    };
    Ok(backend)
}

/// Keys become file names, so only a conservative character set is allowed.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
