use keyring::Entry;
use tracing::debug;

use crate::storage::StorageError;

/// Keychain account the access token is stored under
const TOKEN_ACCOUNT: &str = "access-token";

pub struct TokenStore {
    service: String,
}

impl TokenStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, TOKEN_ACCOUNT)?)
    }

    /// Store the access token in the OS keychain
    pub fn store(&self, token: &str) -> Result<(), StorageError> {
        self.entry()?.set_password(token)?;
        debug!(service = %self.service, "Stored access token");
        Ok(())
    }

    /// The stored token, if any
    pub fn load(&self) -> Result<Option<String>, StorageError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the stored token. Deleting a missing token is not an error.
    pub fn clear(&self) -> Result<(), StorageError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
