//! Store trait and the file-backed / in-memory implementations

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Synchronous key/value string storage
///
/// All operations are infallible by contract: a write that cannot be
/// performed is logged, a read that cannot be performed returns `None`.
/// Parse failures are the caller's concern (see [`load_json`]).
pub trait Store: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Option<String>;

    /// Write `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str);

    /// Remove the value stored under `key`, if any
    fn remove(&self, key: &str);
}

/// Deserialize the JSON value stored under `key`
///
/// Corrupt or unparseable values are treated as absent - the caller is
/// expected to reinitialize, never to surface the corruption as an error.
pub fn load_json<T: DeserializeOwned>(store: &dyn Store, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(%key, error = %e, "load_json: corrupt value, treating as absent");
            None
        }
    }
}

/// Serialize `value` as JSON under `key`
pub fn save_json<T: Serialize>(store: &dyn Store, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, &raw),
        Err(e) => warn!(%key, error = %e, "save_json: serialization failed, value not persisted"),
    }
}

/// File-backed store - one file per key under a data directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "FileStore::open: called");
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "FileStore::open: could not create directory");
        }
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are app-chosen identifiers, not user input; sanitize anyway
        // so a stray separator cannot escape the store directory.
        let safe: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(%key, error = %e, "FileStore::get: read failed, treating as absent");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        let path = self.path_for(key);
        if let Err(e) = fs::write(&path, value) {
            warn!(%key, error = %e, "FileStore::set: write failed, value not persisted");
        }
    }

    fn remove(&self, key: &str) {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(%key, error = %e, "FileStore::remove: remove failed"),
        }
    }
}

/// In-memory store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut map) = self.map.lock() {
            map.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut map) = self.map.lock() {
            map.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        count: u32,
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();

        assert_eq!(store.get("missing"), None);

        store.set("greeting", "hello");
        assert_eq!(store.get("greeting").as_deref(), Some("hello"));

        store.set("greeting", "goodbye");
        assert_eq!(store.get("greeting").as_deref(), Some("goodbye"));

        store.remove("greeting");
        assert_eq!(store.get("greeting"), None);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path());

        assert_eq!(store.get("usage"), None);

        store.set("usage", r#"{"used":1}"#);
        assert_eq!(store.get("usage").as_deref(), Some(r#"{"used":1}"#));

        store.remove("usage");
        assert_eq!(store.get("usage"), None);

        // Removing again is fine
        store.remove("usage");
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let temp = TempDir::new().unwrap();

        {
            let store = FileStore::open(temp.path());
            store.set("history", "[]");
        }

        let store = FileStore::open(temp.path());
        assert_eq!(store.get("history").as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path());

        store.set("../escape", "nope");
        assert_eq!(store.get("../escape").as_deref(), Some("nope"));

        // Nothing landed outside the store directory
        assert!(!temp.path().parent().unwrap().join("escape.json").exists());
    }

    #[test]
    fn test_load_save_json_roundtrip() {
        let store = MemoryStore::new();
        let record = Record {
            name: "fries".to_string(),
            count: 3,
        };

        save_json(&store, "record", &record);
        let loaded: Option<Record> = load_json(&store, "record");
        assert_eq!(loaded, Some(record));
    }

    #[test]
    fn test_load_json_corrupt_is_absent() {
        let store = MemoryStore::new();
        store.set("record", "{not json");

        let loaded: Option<Record> = load_json(&store, "record");
        assert_eq!(loaded, None);
    }

    #[test]
    fn test_load_json_missing_is_absent() {
        let store = MemoryStore::new();
        let loaded: Option<Record> = load_json(&store, "record");
        assert_eq!(loaded, None);
    }
}
