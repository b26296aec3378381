//! Key/value persistence for guide state
//!
//! Values are strings; structured data goes through [`save_json`] /
//! [`load_json`]. [`FileStorage`] keeps every key in a single JSON object on
//! disk and rewrites it atomically.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{GuideError, Result};

/// Current tab record
pub const CURRENT_TAB_KEY: &str = "whileGuide_currentTab";
/// Progress record written by the app bootstrap
pub const PROGRESS_KEY: &str = "whileGuide_progress";
/// Debug switch (`"true"` when enabled)
pub const DEBUG_KEY: &str = "debug";

/// String key/value store
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Serialize `value` as JSON under `key`
pub fn save_json<T: Serialize + ?Sized>(store: &dyn Storage, key: &str, value: &T) -> Result<()> {
    let serialized = serde_json::to_string(value).map_err(|e| GuideError::json(key, e))?;
    store.set(key, &serialized)
}

/// Load JSON stored under `key`, falling back to `default` when the key is
/// missing, unreadable or corrupt.
pub fn load_json<T: DeserializeOwned>(store: &dyn Storage, key: &str, default: T) -> T {
    match store.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Failed to parse stored value for '{}': {}, using default", key, e);
            default
        }),
        Ok(None) => default,
        Err(e) => {
            warn!("Failed to read stored value for '{}': {}, using default", key, e);
            default
        }
    }
}

/// In-memory store, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values().remove(key);
        Ok(())
    }
}

/// One JSON object file holding every key
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Storage file inside `dir` (`storage.json`)
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| GuideError::storage(&self.path, e.to_string()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| GuideError::storage(&self.path, e.to_string()))
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| GuideError::storage(parent, e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(values)
            .map_err(|e| GuideError::json(self.path.display().to_string(), e))?;

        // Write to tmp, then rename, so a crash never leaves half a file.
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json).map_err(|e| GuideError::storage(&tmp_path, e.to_string()))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| GuideError::storage(&self.path, e.to_string()))?;

        Ok(())
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.guard();
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.guard();
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.guard();
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}
