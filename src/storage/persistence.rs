//! KeyValueStore trait: pluggable settings persistence
//!
//! The session saves its test configuration and application settings through
//! this hook and restores them when a new session starts. The backend owns
//! the storage format; values cross the trait as JSON.
//! - `InMemoryStore`: tests and throwaway sessions
//! - `SledStore`: durable local store

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

/// Trait for pluggable key-value backends
///
/// Implementations must be thread-safe (Send + Sync); the session actor
/// calls them from its own task.
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, if any
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>, PersistenceError>;

    /// Store `value` under `key`, replacing any previous value
    fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), PersistenceError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<sled::Error> for PersistenceError {
    fn from(err: sled::Error) -> Self {
        PersistenceError::Storage(err.to_string())
    }
}

/// Load and deserialize a typed value.
pub fn load_typed<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, PersistenceError> {
    store
        .load(key)?
        .map(serde_json::from_value)
        .transpose()
        .map_err(PersistenceError::from)
}

/// Serialize and save a typed value.
pub fn save_typed<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), PersistenceError> {
    store.save(key, &serde_json::to_value(value)?)
}

// ============================================================================
// In-Memory
// ============================================================================

/// In-memory store. Thread-safe via `RwLock`; not durable.
#[derive(Default)]
pub struct InMemoryStore {
    values: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryStore {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>, PersistenceError> {
        let values = self
            .values
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), PersistenceError> {
        let mut values = self
            .values
            .write()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;
        values.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

// ============================================================================
// Sled
// ============================================================================

/// Sled-backed store; values are stored as JSON bytes.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open or create the store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        Ok(Self { db: sled::open(path)? })
    }

    /// Throwaway store removed when dropped
    pub fn temporary() -> Result<Self, PersistenceError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Force buffered writes to disk.
    pub fn flush(&self) -> Result<(), PersistenceError> {
        self.db.flush()?;
        Ok(())
    }
}

impl KeyValueStore for SledStore {
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>, PersistenceError> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec(value)?;
        self.db.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}
