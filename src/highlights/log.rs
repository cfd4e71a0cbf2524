//! Per-chapter highlight log

use serde_json::Value;

use crate::anchor::AnchorDescriptor;
use crate::storage::{load_json, save_json, KeyValueStore, StoreError};

const KEY_PREFIX: &str = "sr:hl:";

/// Storage key holding the log for `chapter_url`
pub fn log_key(chapter_url: &str) -> String {
    format!("{}{}", KEY_PREFIX, chapter_url)
}

/// Repository for highlight descriptors, one append-only array per chapter
pub struct HighlightLog<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> HighlightLog<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Append a descriptor to the chapter's log, creating the log if needed.
    ///
    /// Entries that no longer parse are carried over untouched.
    pub fn append(&self, chapter_url: &str, descriptor: &AnchorDescriptor) -> Result<(), StoreError> {
        let key = log_key(chapter_url);
        let mut entries = self.load_raw(&key);
        entries.push(serde_json::to_value(descriptor)?);
        save_json(self.store, &key, &entries)?;

        tracing::debug!("Logged highlight #{} for {}", entries.len(), chapter_url);
        Ok(())
    }

    /// Drop the chapter's whole log
    pub fn clear_all(&self, chapter_url: &str) -> Result<(), StoreError> {
        self.store.remove(&log_key(chapter_url))
    }

    /// Descriptors for the chapter in creation order.
    ///
    /// Missing or corrupt logs read as empty; individual malformed entries are
    /// left out.
    pub fn load_all(&self, chapter_url: &str) -> Vec<AnchorDescriptor> {
        self.load_raw(&log_key(chapter_url))
            .into_iter()
            .enumerate()
            .filter_map(|(position, entry)| match serde_json::from_value(entry) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    tracing::debug!("Ignoring malformed entry #{} for {}: {}", position, chapter_url, e);
                    None
                }
            })
            .collect()
    }

    fn load_raw(&self, key: &str) -> Vec<Value> {
        load_json(self.store, key).unwrap_or_default()
    }
}
