//! Session identity and the durable store behind it.
//!
//! A widget talks to its webhook under one session id.  When the options ask
//! for it, the id survives restarts by living in a [`SessionStore`] under
//! `n8n-chat-session-<chatSessionKey>`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::ChatConfig;
use crate::error::{Error, Result};

/// Durable keyed string storage.
pub trait SessionStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing what was there.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// A process-local store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding one value.
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::default();
        store.values.lock().insert(key.into(), value.into());
        store
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A store backed by a JSON object on disk.
///
/// Every `set` rewrites the whole file; the file holds a handful of keys.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    /// A store at `path`.  The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The store at `<data dir>/hookchat/sessions.json`.
    pub fn open_default() -> Self {
        Self::new(default_store_path())
    }

    /// Where this store keeps its values.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(err) => {
                return Err(Error::storage(
                    format!("failed to read {}", self.path.display()),
                    Some(Box::new(err)),
                ));
            }
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|err| {
            Error::storage(
                format!("failed to parse {}", self.path.display()),
                Some(Box::new(err)),
            )
        })
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| {
                Error::storage(
                    format!("failed to create {}", parent.display()),
                    Some(Box::new(err)),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(&values)?;
        fs::write(&self.path, json).map_err(|err| {
            Error::storage(
                format!("failed to write {}", self.path.display()),
                Some(Box::new(err)),
            )
        })
    }
}

/// Default location of the file store.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hookchat")
        .join("sessions.json")
}

/// A fresh random session id.
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// The session id of one widget and, when persistence is on, where it lives.
pub struct Session {
    id: String,
    key: String,
    persist: bool,
    store: Box<dyn SessionStore>,
}

impl Session {
    /// Load the stored id or make a new one.
    ///
    /// With `loadPreviousSession` on, a stored id is reused and a newly made
    /// one is written back.  With it off the store is never touched.
    pub fn open(config: &ChatConfig, store: Box<dyn SessionStore>) -> Result<Self> {
        let key = config.storage_key();
        let persist = config.load_previous_session;
        let stored = if persist { store.get(&key)? } else { None };
        let id = match stored.filter(|id| !id.is_empty()) {
            Some(id) => {
                tracing::debug!(%key, "reusing stored session id");
                id
            }
            None => {
                let id = generate_session_id();
                if persist {
                    store.set(&key, &id)?;
                }
                id
            }
        };
        Ok(Self {
            id,
            key,
            persist,
            store,
        })
    }

    /// The current id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The storage key, used whether or not persistence is on.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replace the id with a fresh one, persisting it if enabled.
    ///
    /// The new id is kept even if persisting it fails.
    pub fn reset(&mut self) -> Result<&str> {
        self.id = generate_session_id();
        if self.persist {
            self.store.set(&self.key, &self.id)?;
        }
        Ok(&self.id)
    }
}
