use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use super::error::{Result, StorageError};

const AVAILABILITY_KEY: &str = "__test__";

/// String key/value storage with the semantics of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Checks the backend with a throwaway write followed by a delete.
    fn is_available(&self) -> bool {
        self.set(AVAILABILITY_KEY, AVAILABILITY_KEY).is_ok() && self.remove(AVAILABILITY_KEY).is_ok()
    }
}

/// Builds `<prefix>_<email>` or `<prefix>_<email>_<suffix>`.
pub fn namespaced_key(prefix: &str, email: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{}_{}_{}", prefix, email, suffix),
        None => format!("{}_{}", prefix, email),
    }
}

pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| StorageError::Unavailable("store lock poisoned".to_string()))
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write, like a full or disabled local storage.
    pub fn read_only() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            read_only: true,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.read_only {
            return Err(StorageError::Unavailable("store is read-only".to_string()));
        }
        lock(&self.entries)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.read_only {
            return Err(StorageError::Unavailable("store is read-only".to_string()));
        }
        lock(&self.entries)?.remove(key);
        Ok(())
    }
}

/// Single JSON document on disk mapping keys to string values.
///
/// The whole document is rewritten after each mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            Self::load(&path)?
        } else {
            BTreeMap::new()
        };

        debug!("Opened store at {} ({} keys)", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Store file inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Result<Self> {
        Self::open(data_dir.join("store.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<BTreeMap<String, String>> {
        let raw = std::fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!("Store file {} is corrupt, starting empty: {}", path.display(), e);
                Ok(BTreeMap::new())
            }
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    // Mutations land in `entries` only once the file write succeeded.
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock(&self.entries)?;
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = lock(&self.entries)?;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }
}
