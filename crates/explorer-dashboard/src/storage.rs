//! Local key-value persistence.
//!
//! Holds the installation's user identifier and the last known position.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use explorer_core::StorageError;
use explorer_weather::Coordinates;
use parking_lot::Mutex;

pub const USER_IDENTIFIER_KEY: &str = "user_identifier";
pub const LAST_LOCATION_KEY: &str = "last_location";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Volatile store, used in tests and when no config directory is writable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Store persisted as a JSON object, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let entries = if path.exists() {
            let json =
                fs::read_to_string(path).map_err(|e| StorageError::ReadFailed(e.to_string()))?;
            serde_json::from_str(&json).map_err(|e| StorageError::Corrupted(e.to_string()))?
        } else {
            BTreeMap::new()
        };

        tracing::debug!("Opened store at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    /// Open the store at `path`, moving a corrupt file aside to
    /// `<path>.corrupt` and starting empty so new writes persist.
    pub fn open_or_reset(path: &Path) -> Result<Self, StorageError> {
        match Self::open(path) {
            Err(StorageError::Corrupted(reason)) => {
                let mut backup = path.as_os_str().to_owned();
                backup.push(".corrupt");
                let backup = PathBuf::from(backup);
                tracing::warn!(
                    "Store at {} is corrupted ({}), moving it to {}",
                    path.display(),
                    reason,
                    backup.display()
                );
                fs::rename(path, &backup).map_err(|e| StorageError::WriteFailed(e.to_string()))?;
                Self::open(path)
            }
            other => other,
        }
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| StorageError::WriteFailed(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

/// Last cached position, if any. Unreadable values are ignored.
pub fn load_last_location(store: &dyn KeyValueStore) -> Option<Coordinates> {
    let raw = store.get(LAST_LOCATION_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(coords) => Some(coords),
        Err(e) => {
            tracing::warn!("Ignoring unreadable {}: {}", LAST_LOCATION_KEY, e);
            None
        }
    }
}

pub fn save_last_location(
    store: &dyn KeyValueStore,
    coordinates: Coordinates,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(&coordinates)
        .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
    store.set(LAST_LOCATION_KEY, &json)
}
