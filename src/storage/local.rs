//! Key/value storage with local-storage semantics.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{SouthbayResult, StorageError};

/// String key/value store.
pub trait LocalStorage: Send + Sync {
    /// Read the value for a key.
    fn get_item(&self, key: &str) -> SouthbayResult<Option<String>>;

    /// Write the value for a key.
    fn set_item(&self, key: &str, value: &str) -> SouthbayResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> SouthbayResult<()>;
}

/// In-memory local storage.
#[derive(Default)]
pub struct InMemoryLocalStorage {
    items: Mutex<HashMap<String, String>>,
    should_fail: Mutex<bool>,
}

impl InMemoryLocalStorage {
    /// Create new in-memory local storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail, to exercise error paths.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock() = should_fail;
        self
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn check_error(&self) -> SouthbayResult<()> {
        if *self.should_fail.lock() {
            return Err(StorageError::WriteFailed {
                message: "storage unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl LocalStorage for InMemoryLocalStorage {
    fn get_item(&self, key: &str) -> SouthbayResult<Option<String>> {
        self.check_error()?;
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> SouthbayResult<()> {
        self.check_error()?;
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> SouthbayResult<()> {
        self.check_error()?;
        self.items.lock().remove(key);
        Ok(())
    }
}

/// Local storage persisted as a JSON object in a single file, so a session
/// survives process restarts.
pub struct FileLocalStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileLocalStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> SouthbayResult<HashMap<String, String>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    message: e.to_string(),
                }
                .into())
            }
        };
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            StorageError::CorruptedData {
                message: format!("{}: {}", self.path.display(), e),
            }
            .into()
        })
    }

    fn save(&self, items: &HashMap<String, String>) -> SouthbayResult<()> {
        let write_failed = |message: String| StorageError::WriteFailed { message };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
            }
        }
        let raw = serde_json::to_string_pretty(items).map_err(|e| write_failed(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| write_failed(e.to_string()))?;
        Ok(())
    }
}

impl LocalStorage for FileLocalStorage {
    fn get_item(&self, key: &str) -> SouthbayResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> SouthbayResult<()> {
        let _guard = self.lock.lock();
        let mut items = self.load()?;
        items.insert(key.to_string(), value.to_string());
        self.save(&items)
    }

    fn remove_item(&self, key: &str) -> SouthbayResult<()> {
        let _guard = self.lock.lock();
        let mut items = self.load()?;
        if items.remove(key).is_some() {
            self.save(&items)?;
        }
        Ok(())
    }
}
