//! Global key/value state.
//!
//! Values live in memory and can be mirrored to session storage (process
//! lifetime) or local storage (`storage.json` in the state directory). Every
//! persisted key carries the `goat:` prefix. A memory miss hydrates from
//! session storage first, then local storage. Every change dispatches
//! `global.{key}` on the bus after the store's lock is released.

use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use goat::bus::{event_name, Event, EventBus};

use crate::error::{AppError, Result};

pub const STORAGE_PREFIX: &str = "goat:";
pub const STORAGE_FILE: &str = "storage.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Persisted to disk
    Local,
    /// Kept for the life of the process
    Session,
}

/// Options for [`GlobalStore::set_with`] and [`GlobalStore::remove_with`].
///
/// `storage` picks where a set is mirrored. On removal it limits which
/// storage is cleared (`None` clears both). `dispatch` defaults to true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub storage: Option<StorageKind>,
    pub dispatch: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            storage: None,
            dispatch: true,
        }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage(self, kind: StorageKind) -> Self {
        self.storage_opt(Some(kind))
    }

    pub fn storage_opt(mut self, storage: Option<StorageKind>) -> Self {
        self.storage = storage;
        self
    }

    /// Skip the `global.{key}` event
    pub fn silent(mut self) -> Self {
        self.dispatch = false;
        self
    }
}

fn storage_key(key: &str) -> String {
    format!("{STORAGE_PREFIX}{key}")
}

#[derive(Debug, Default)]
struct StoreState {
    memory: Map<String, Value>,
    session: Map<String, Value>,
    /// Loaded on first use
    local: Option<Map<String, Value>>,
}

#[derive(Debug)]
pub struct GlobalStore {
    state_dir: PathBuf,
    bus: EventBus,
    state: Mutex<StoreState>,
}

impl GlobalStore {
    pub fn new(state_dir: impl Into<PathBuf>, bus: EventBus) -> Self {
        Self {
            state_dir: state_dir.into(),
            bus,
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn storage_path(&self) -> PathBuf {
        self.state_dir.join(STORAGE_FILE)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read the local storage file. A corrupt file is logged and treated as empty.
    fn load_local(&self) -> Result<Map<String, Value>> {
        let path = self.storage_path();
        if !path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&path).map_err(|source| AppError::Storage {
            path: path.clone(),
            source,
        })?;
        match serde_json::from_str::<Map<String, Value>>(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable local storage, starting empty");
                Ok(Map::new())
            }
        }
    }

    fn local<'s>(&self, state: &'s mut StoreState) -> Result<&'s mut Map<String, Value>> {
        if state.local.is_none() {
            state.local = Some(self.load_local()?);
        }
        Ok(state.local.get_or_insert_with(Map::new))
    }

    fn save_local(&self, local: &Map<String, Value>) -> Result<()> {
        let storage_err = |source| AppError::Storage {
            path: self.state_dir.clone(),
            source,
        };
        fs::create_dir_all(&self.state_dir).map_err(storage_err)?;
        let path = self.storage_path();
        let content = serde_json::to_string_pretty(local).map_err(|source| AppError::StorageFormat {
            path: path.clone(),
            source,
        })?;

        // Atomic write using temp file
        let temp_path = self.state_dir.join(format!("{STORAGE_FILE}.tmp"));
        let mut file = fs::File::create(&temp_path).map_err(storage_err)?;
        file.write_all(content.as_bytes()).map_err(storage_err)?;
        file.sync_all().map_err(storage_err)?;
        drop(file);

        fs::rename(&temp_path, &path).map_err(storage_err)?;
        Ok(())
    }

    /// Value for `key`, hydrating memory from session then local storage on a miss.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut state = self.lock();
        if let Some(value) = state.memory.get(key) {
            return Ok(Some(value.clone()));
        }
        let stored = storage_key(key);
        let hydrated = match state.session.get(&stored).cloned() {
            Some(value) => Some(value),
            None => self.local(&mut state)?.get(&stored).cloned(),
        };
        if let Some(value) = &hydrated {
            debug!(key, "hydrated from storage");
            state.memory.insert(key.to_string(), value.clone());
        }
        Ok(hydrated)
    }

    /// Store `value` under `key`, optionally mirroring it to a storage, and
    /// dispatch `global.{key}`.
    pub fn set(&self, key: &str, value: Value, storage: Option<StorageKind>) -> Result<()> {
        self.set_with(key, value, StoreOptions::new().storage_opt(storage))
    }

    /// `set` with explicit options. The storage write happens first; memory
    /// only changes once it has succeeded.
    pub fn set_with(&self, key: &str, value: Value, options: StoreOptions) -> Result<()> {
        {
            let mut state = self.lock();
            match options.storage {
                Some(StorageKind::Session) => {
                    state.session.insert(storage_key(key), value.clone());
                }
                Some(StorageKind::Local) => {
                    let local = self.local(&mut state)?;
                    let mut staged = local.clone();
                    staged.insert(storage_key(key), value.clone());
                    self.save_local(&staged)?;
                    *local = staged;
                }
                None => {}
            }
            state.memory.insert(key.to_string(), value.clone());
        }
        if options.dispatch {
            self.dispatch(key, Some(value));
        }
        Ok(())
    }

    /// Drop `key` from memory and both storages, then dispatch `global.{key}` with no value.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.remove_with(key, StoreOptions::new())
    }

    /// `remove` with explicit options. A storage kind limits which storage
    /// loses the key; memory is always cleared.
    pub fn remove_with(&self, key: &str, options: StoreOptions) -> Result<()> {
        {
            let mut state = self.lock();
            let stored = storage_key(key);
            if options.storage != Some(StorageKind::Session) {
                let local = self.local(&mut state)?;
                if local.contains_key(&stored) {
                    let mut staged = local.clone();
                    staged.remove(&stored);
                    self.save_local(&staged)?;
                    *local = staged;
                }
            }
            if options.storage != Some(StorageKind::Local) {
                state.session.remove(&stored);
            }
            state.memory.remove(key);
        }
        if options.dispatch {
            self.dispatch(key, None);
        }
        Ok(())
    }

    /// Fill memory from `initial` without events. Keys already persisted in
    /// session or local storage keep their stored value.
    pub fn seed(&self, initial: &Map<String, Value>) -> Result<()> {
        let mut state = self.lock();
        for (key, value) in initial {
            let stored = storage_key(key);
            let persisted = match state.session.get(&stored).cloned() {
                Some(value) => Some(value),
                None => self.local(&mut state)?.get(&stored).cloned(),
            };
            match persisted {
                Some(stored_value) => {
                    debug!(key = %key, "keeping persisted value over initial state");
                    state.memory.insert(key.clone(), stored_value);
                }
                None => {
                    state.memory.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    fn dispatch(&self, key: &str, value: Option<Value>) {
        self.bus.dispatch(
            &event_name("global", key),
            &Event::Global {
                key: key.to_string(),
                value,
            },
        );
    }

    /// Keys currently held in memory, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().memory.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// In-memory values as a JSON object
    pub fn snapshot(&self) -> Value {
        Value::Object(self.lock().memory.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[test]
    fn test_set_get_and_event() {
        let dir = TempDir::new().unwrap();
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe("global.user", "recorder", move |event| {
            if let Event::Global { value, .. } = event {
                sink.lock().unwrap().push(value.clone());
            }
        });

        let store = GlobalStore::new(dir.path(), bus);
        store.set("user", json!({"name": "Ada"}), None).unwrap();
        assert_eq!(store.get("user").unwrap(), Some(json!({"name": "Ada"})));
        store.remove("user").unwrap();
        assert_eq!(store.get("user").unwrap(), None);

        assert_eq!(*seen.lock().unwrap(), vec![Some(json!({"name": "Ada"})), None]);
        assert!(!dir.path().join(STORAGE_FILE).exists());
    }

    #[test]
    fn test_local_storage_survives_a_new_store() {
        let dir = TempDir::new().unwrap();
        {
            let store = GlobalStore::new(dir.path(), EventBus::new());
            store.set("theme", json!("dark"), Some(StorageKind::Local)).unwrap();
            store.set("draft", json!("x"), Some(StorageKind::Session)).unwrap();
        }

        let content = fs::read_to_string(dir.path().join(STORAGE_FILE)).unwrap();
        let on_disk: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(on_disk, json!({"goat:theme": "dark"}));
        assert!(!dir.path().join("storage.json.tmp").exists());

        let store = GlobalStore::new(dir.path(), EventBus::new());
        assert!(store.keys().is_empty());
        assert_eq!(store.get("theme").unwrap(), Some(json!("dark")));
        assert_eq!(store.get("draft").unwrap(), None);
        assert_eq!(store.keys(), vec!["theme".to_string()]);

        store.remove("theme").unwrap();
        let content = fs::read_to_string(dir.path().join(STORAGE_FILE)).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&content).unwrap(), json!({}));
    }

    #[test]
    fn test_session_wins_over_local() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STORAGE_FILE), r#"{"goat:lang": "fr"}"#).unwrap();
        let store = GlobalStore::new(dir.path(), EventBus::new());
        store.set("lang", json!("es"), Some(StorageKind::Session)).unwrap();
        {
            store.lock().memory.clear();
        }
        assert_eq!(store.get("lang").unwrap(), Some(json!("es")));
    }

    #[test]
    fn test_corrupt_storage_starts_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STORAGE_FILE), "not json").unwrap();
        let store = GlobalStore::new(dir.path(), EventBus::new());
        assert_eq!(store.get("anything").unwrap(), None);
        store.set("k", json!(1), Some(StorageKind::Local)).unwrap();
        assert_eq!(store.snapshot(), json!({"k": 1}));
    }

    fn recorded(bus: &EventBus, event: &str) -> Arc<Mutex<Vec<Option<Value>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(event, "recorder", move |event| {
            if let Event::Global { value, .. } = event {
                sink.lock().unwrap().push(value.clone());
            }
        });
        seen
    }

    #[test]
    fn test_silent_set_and_remove() {
        let dir = TempDir::new().unwrap();
        let bus = EventBus::new();
        let seen = recorded(&bus, "global.count");
        let store = GlobalStore::new(dir.path(), bus);

        store.set_with("count", json!(1), StoreOptions::new().silent()).unwrap();
        assert_eq!(store.get("count").unwrap(), Some(json!(1)));
        store.remove_with("count", StoreOptions::new().silent()).unwrap();
        assert_eq!(store.get("count").unwrap(), None);
        assert!(seen.lock().unwrap().is_empty());

        store.set("count", json!(2), None).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![Some(json!(2))]);
    }

    #[test]
    fn test_remove_limited_to_one_storage() {
        let dir = TempDir::new().unwrap();
        let store = GlobalStore::new(dir.path(), EventBus::new());
        store.set("lang", json!("fr"), Some(StorageKind::Local)).unwrap();
        store.set("lang", json!("es"), Some(StorageKind::Session)).unwrap();

        store.remove_with("lang", StoreOptions::new().storage(StorageKind::Session)).unwrap();
        assert_eq!(store.get("lang").unwrap(), Some(json!("fr")));

        store.set("lang", json!("es"), Some(StorageKind::Session)).unwrap();
        store.remove_with("lang", StoreOptions::new().storage(StorageKind::Local)).unwrap();
        let content = fs::read_to_string(dir.path().join(STORAGE_FILE)).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&content).unwrap(), json!({}));
        assert_eq!(store.get("lang").unwrap(), Some(json!("es")));
    }

    #[test]
    fn test_seed_keeps_persisted_values() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STORAGE_FILE), r#"{"goat:theme": "dark"}"#).unwrap();
        let bus = EventBus::new();
        let themes = recorded(&bus, "global.theme");
        let pages = recorded(&bus, "global.page");
        let store = GlobalStore::new(dir.path(), bus);

        let initial = json!({"theme": "light", "page": 1});
        store.seed(initial.as_object().unwrap()).unwrap();

        assert_eq!(store.snapshot(), json!({"theme": "dark", "page": 1}));
        assert!(themes.lock().unwrap().is_empty());
        assert!(pages.lock().unwrap().is_empty());
        assert!(!fs::read_to_string(dir.path().join(STORAGE_FILE)).unwrap().contains("page"));
    }

    #[test]
    fn test_failed_local_write_leaves_memory_alone() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();
        let bus = EventBus::new();
        let seen = recorded(&bus, "global.theme");
        let store = GlobalStore::new(blocker.join("state"), bus);

        let result = store.set("theme", json!("dark"), Some(StorageKind::Local));
        assert!(matches!(result, Err(AppError::Storage { .. })));
        assert_eq!(store.get("theme").unwrap(), None);
        assert!(store.keys().is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }
}
