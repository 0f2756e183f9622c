//! Encrypted file backend.
//!
//! Values are sealed with ChaCha20-Poly1305 and written as hex of
//! `nonce || ciphertext`. The 256-bit key is derived with Argon2id from a
//! random secret that lives in the OS keychain, so the files alone are not
//! enough to read the cache.

use std::path::PathBuf;

use argon2::Argon2;
use async_trait::async_trait;
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use keyring::Entry;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info};

use super::file::{read_optional, write_atomic};
use super::{validate_key, StorageBackend, StorageError};

/// Keychain account holding the storage secret
const KEYCHAIN_ACCOUNT: &str = "storage-secret";

/// Fixed salt: the secret is already random, the salt only separates this
/// derivation from any other use of the same secret.
const KDF_SALT: &[u8] = b"concache/storage/v1";

/// Length of the random keychain secret in bytes (hex encoded when stored)
const SECRET_LEN: usize = 32;

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
const NONCE_LEN: usize = 12;

pub struct SecureStorage {
    dir: PathBuf,
    cipher: ChaCha20Poly1305,
}

impl SecureStorage {
    /// Open the store in `dir`, creating the keychain secret for `service`
    /// on first use.
    pub fn open(dir: PathBuf, service: &str) -> Result<Self, StorageError> {
        let secret = load_or_create_secret(service)?;
        let key = derive_key(secret.as_bytes())?;
        Self::with_key(dir, key)
    }

    /// Open the store with an explicit key, bypassing the keychain.
    pub fn with_key(dir: PathBuf, key: [u8; 32]) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.sealed", key)))
    }

    fn seal(&self, plaintext: &[u8]) -> Result<String, StorageError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| StorageError::Crypto(format!("Encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(hex::encode(sealed))
    }

    fn unseal(&self, text: &str) -> Result<String, StorageError> {
        let sealed = hex::decode(text.trim())
            .map_err(|e| StorageError::Crypto(format!("Corrupt sealed value: {e}")))?;
        if sealed.len() < NONCE_LEN {
            return Err(StorageError::Crypto("Sealed value too short".to_string()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| StorageError::Crypto("Failed to decrypt value (wrong key?)".to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|e| StorageError::Crypto(format!("Decrypted value is not UTF-8: {e}")))
    }
}

/// Derive the 256-bit storage key from the keychain secret.
fn derive_key(secret: &[u8]) -> Result<[u8; 32], StorageError> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(secret, KDF_SALT, &mut key)
        .map_err(|e| StorageError::Crypto(format!("Key derivation failed: {e}")))?;
    Ok(key)
}

fn load_or_create_secret(service: &str) -> Result<String, StorageError> {
    let entry = Entry::new(service, KEYCHAIN_ACCOUNT)?;
    match entry.get_password() {
        Ok(secret) => {
            debug!(service = service, "Loaded storage secret from keychain");
            Ok(secret)
        }
        Err(keyring::Error::NoEntry) => {
            let mut bytes = [0u8; SECRET_LEN];
            OsRng.fill_bytes(&mut bytes);
            let secret = hex::encode(bytes);
            entry.set_password(&secret)?;
            info!(service = service, "Created new storage secret in keychain");
            Ok(secret)
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl StorageBackend for SecureStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match read_optional(&path).await? {
            Some(text) => self.unseal(&text).map(Some),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let sealed = self.seal(value.as_bytes())?;
        write_atomic(&path, sealed.as_bytes()).await
    }
}
