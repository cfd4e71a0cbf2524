//! Durable key-value storage
//!
//! Everything the reader persists (highlight logs, scroll positions, deck
//! progress, preferences) goes through a [`KeyValueStore`] that is handed to
//! the component using it. Values are raw strings, usually JSON, so a store
//! can hold whatever a browser `localStorage` would, including garbage.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String-keyed durable storage.
///
/// Writers race with last-writer-wins semantics; there is no conflict
/// detection.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Read and parse a JSON value. Missing keys, unreadable storage and
/// unparsable data all come back as `None`.
pub fn load_json<T, S>(store: &S, key: &str) -> Option<T>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", key, e);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring corrupt value under {}: {}", key, e);
            None
        }
    }
}

/// Serialize `value` as JSON and store it under `key`
pub fn save_json<T, S>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_load_json_round_trip() {
        let store = MemoryStore::new();
        let mut value = BTreeMap::new();
        value.insert("theme".to_string(), "dark".to_string());

        save_json(&store, "prefs", &value).unwrap();
        let loaded: Option<BTreeMap<String, String>> = load_json(&store, "prefs");

        assert_eq!(loaded, Some(value));
    }

    #[test]
    fn test_load_json_missing_and_corrupt() {
        let store = MemoryStore::new();
        assert_eq!(load_json::<u32, _>(&store, "missing"), None);

        store.set("broken", "not json").unwrap();
        assert_eq!(load_json::<u32, _>(&store, "broken"), None);
    }
}
