//! Persistent client-side identity state.
//!
//! The storefront keeps a handful of opaque strings between runs: the
//! customer's bearer token, the current cart id, the anonymous analytics
//! fingerprint and the anonymous basket. None of them expire on the client;
//! they live until explicitly removed or until the store is wiped.
//!
//! [`KeyValueStore`] is the seam: [`MemoryStore`] for tests and embedding,
//! [`FileStore`] for the CLI.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

/// Storage keys for persisted identity state.
pub mod keys {
    /// Customer bearer token.
    pub const AUTH_TOKEN: &str = "auth_token";

    /// Current server cart id.
    pub const CART_ID: &str = "cart_id";

    /// Long-lived anonymous analytics identifier.
    pub const FINGERPRINT_ID: &str = "fingerprint_id";

    /// JSON-encoded lines of the anonymous basket.
    pub const ANONYMOUS_BASKET: &str = "anonymous_basket";
}

/// File name used by [`FileStore`] inside its state directory.
const STATE_FILE: &str = "state.json";

/// Errors that can occur while persisting state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backing file holds something other than a JSON string map.
    #[error("storage format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// A string key-value store shared by the client and the session layer.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal could not be persisted.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn lock(map: &Mutex<HashMap<String, String>>) -> MutexGuard<'_, HashMap<String, String>> {
    // A panic mid-insert cannot leave a HashMap logically torn.
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MemoryStore
// =============================================================================

/// Process-scoped store; everything is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.values).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.values).remove(key);
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// Store backed by a single JSON file in a state directory.
///
/// The whole map is rewritten on every change through a temp file and a
/// rename, so a crash leaves either the old or the new state on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or create) the store inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the existing
    /// state file cannot be parsed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(STATE_FILE);

        let values = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => HashMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), keys = values.len(), "Opened state file");

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &HashMap<String, String>) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = lock(&self.values);
        values.insert(key.to_owned(), value.to_owned());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = lock(&self.values);
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get(keys::CART_ID).is_none());

        store.set(keys::CART_ID, "cart_1").unwrap();
        assert_eq!(store.get(keys::CART_ID).as_deref(), Some("cart_1"));

        store.remove(keys::CART_ID).unwrap();
        store.remove(keys::CART_ID).unwrap();
        assert!(store.get(keys::CART_ID).is_none());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        store.set(keys::AUTH_TOKEN, "tok_abc").unwrap();
        store.set(keys::CART_ID, "cart_1").unwrap();
        store.remove(keys::CART_ID).unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(keys::AUTH_TOKEN).as_deref(), Some("tok_abc"));
        assert!(reopened.get(keys::CART_ID).is_none());
        assert!(!reopened.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_state() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STATE_FILE), "[1, 2, 3]").unwrap();

        let err = FileStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, StorageError::Format(_)));
    }
}
