//! Local persistent key-value storage for the open-session marker
//!
//! Only three fixed keys are ever written; they are the contract that lets a
//! restarted process adopt a still-open session instead of double-counting
//! it. Concurrent writers may race on the file store; last writer wins.

use log::warn;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

pub const SESSION_ID_KEY: &str = "sessionId";
pub const SESSION_START_KEY: &str = "inicioSesion";
pub const SESSION_USER_KEY: &str = "usuario";

/// Minimal key-value contract over the local persistent storage.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Volatile implementation for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryLocalStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .expect("local store lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .write()
            .expect("local store lock poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values
            .write()
            .expect("local store lock poisoned")
            .remove(key);
    }
}

/// JSON-file-backed implementation; the marker survives a process restart.
pub struct FileLocalStore {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl FileLocalStore {
    /// Open the store, loading any existing marker file.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<Value>(&content).ok())
            .and_then(|value| match value {
                Value::Object(map) => Some(
                    map.into_iter()
                        .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();
        Self {
            path,
            values: RwLock::new(values),
        }
    }

    fn flush(&self, values: &HashMap<String, String>) {
        let json = serde_json::to_string_pretty(values).unwrap_or_else(|_| "{}".to_string());
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(err) = std::fs::write(&self.path, json) {
            // Marker persistence is best-effort
            warn!("failed to persist session marker to {}: {err}", self.path.display());
        }
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .expect("local store lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.values.write().expect("local store lock poisoned");
        values.insert(key.to_string(), value.to_string());
        self.flush(&values);
    }

    fn remove(&self, key: &str) {
        let mut values = self.values.write().expect("local store lock poisoned");
        values.remove(key);
        self.flush(&values);
    }
}
