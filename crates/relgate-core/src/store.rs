use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Invalid store key `{key}`")]
    InvalidKey { key: String },

    #[error("Failed to {action} `{key}` ({kind}): {message}")]
    Io {
        action: &'static str,
        key: String,
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("Failed to encode `{key}`: {message}")]
    Encode { key: String, message: String },
}

impl StoreError {
    fn io(action: &'static str, key: &str, error: &std::io::Error) -> Self {
        Self::Io {
            action,
            key: key.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// A value together with the moment it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredValue {
    pub stored_at: DateTime<Utc>,
    pub value: serde_json::Value,
}

impl StoredValue {
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        Self {
            stored_at: Utc::now(),
            value,
        }
    }

    /// Whether the value is younger than `max_age`. A value stamped in the
    /// future counts as fresh.
    #[must_use]
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        match (Utc::now() - self.stored_at).to_std() {
            Ok(age) => age < max_age,
            Err(_) => true,
        }
    }
}

/// Persistent key-value storage shared by the update check and install steps.
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    /// Returns an error when the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<StoredValue>, StoreError>;

    /// # Errors
    /// Returns an error when the value cannot be persisted.
    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;
}

/// Stores each key as a JSON file inside one directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for DiskStore {
    fn get(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        let path = self.path_for(key)?;
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(StoreError::io("read", key, &error)),
        };

        match serde_json::from_str(&data) {
            Ok(stored) => Ok(Some(stored)),
            Err(error) => {
                warn!("Ignoring unreadable store entry {}: {error}", path.display());
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let data = serde_json::to_vec(&StoredValue::new(value)).map_err(|error| {
            StoreError::Encode {
                key: key.to_string(),
                message: error.to_string(),
            }
        })?;

        std::fs::create_dir_all(&self.dir)
            .map_err(|error| StoreError::io("create directory for", key, &error))?;
        write_atomic(&path, &data).map_err(|error| StoreError::io("write", key, &error))
    }
}

/// In-process store, for embedding callers that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry with an explicit timestamp.
    pub fn insert(&self, key: &str, stored: StoredValue) {
        self.lock().insert(key.to_string(), stored);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredValue>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        self.lock().insert(key.to_string(), StoredValue::new(value));
        Ok(())
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "store path has no parent")
    })?;

    let file_name = path
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("entry");
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let pid = std::process::id();

    let mut tmp_path = None;
    for attempt in 0..16_u8 {
        let candidate = parent.join(format!(".{file_name}.{pid}.{timestamp}.{attempt}.tmp"));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                file.write_all(data)?;
                file.sync_all()?;
                tmp_path = Some(candidate);
                break;
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }

    let Some(tmp_path) = tmp_path else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "failed to create unique store temp file",
        ));
    };

    if let Err(error) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(error);
    }

    Ok(())
}
