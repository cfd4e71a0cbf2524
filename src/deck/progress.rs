//! Review position per system, topic and source

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::library::DeckSource;
use crate::storage::{load_json, save_json, KeyValueStore, StoreError};

/// Storage key holding every saved position
pub const PROGRESS_KEY: &str = "rd_progress_v1";

/// Map key for one deck
pub fn progress_key(system: &str, topic: &str, source: DeckSource) -> String {
    format!("{}::{}::{}", system, topic, source.key())
}

/// Last card viewed in a deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardProgress {
    #[serde(default)]
    pub idx: i64,
    /// Epoch milliseconds of the last save
    #[serde(default)]
    pub t: i64,
}

/// All saved positions share one JSON object under [`PROGRESS_KEY`]
pub struct ProgressLog<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> ProgressLog<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn load_raw(&self) -> BTreeMap<String, Value> {
        load_json(self.store, PROGRESS_KEY).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<CardProgress> {
        let entry = self.load_raw().remove(key)?;
        serde_json::from_value(entry).ok()
    }

    pub fn record(&self, key: &str, idx: usize) -> Result<(), StoreError> {
        let mut all = self.load_raw();
        let progress = CardProgress {
            idx: i64::try_from(idx).unwrap_or(i64::MAX),
            t: Utc::now().timestamp_millis(),
        };
        all.insert(key.to_string(), serde_json::to_value(progress)?);
        save_json(self.store, PROGRESS_KEY, &all)
    }
}
