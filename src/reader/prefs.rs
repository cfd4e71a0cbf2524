//! Reader preferences and bookkeeping keys

use serde::{Deserialize, Serialize};

use crate::storage::{load_json, save_json, KeyValueStore, StoreError};
use crate::theme::Theme;

pub const PREFS_KEY: &str = "sr:prefs";
pub const LAST_KEY: &str = "sr:last";
const SCROLL_PREFIX: &str = "sr:scroll:";

/// Storage key of the saved scroll offset for `chapter_url`
pub fn scroll_key(chapter_url: &str) -> String {
    format!("{}{}", SCROLL_PREFIX, chapter_url)
}

/// Display preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderPrefs {
    pub theme: Theme,
    /// Reader font size in CSS pixels
    #[serde(rename = "fontSize")]
    pub font_size: u32,
}

impl Default for ReaderPrefs {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            font_size: 19,
        }
    }
}

impl ReaderPrefs {
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        load_json(store, PREFS_KEY).unwrap_or_default()
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        save_json(store, PREFS_KEY, self)
    }
}

/// Chapter to reopen on the next start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastChapter {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_prefs_defaults_and_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(ReaderPrefs::load(&store), ReaderPrefs::default());

        let prefs = ReaderPrefs {
            theme: Theme::Light,
            font_size: 22,
        };
        prefs.save(&store).unwrap();

        assert_eq!(
            store.get(PREFS_KEY).unwrap().as_deref(),
            Some(r#"{"theme":"light","fontSize":22}"#)
        );
        assert_eq!(ReaderPrefs::load(&store), prefs);
    }

    #[test]
    fn test_partial_and_corrupt_prefs() {
        let store = MemoryStore::new();
        store.set(PREFS_KEY, r#"{"fontSize":24}"#).unwrap();
        assert_eq!(
            ReaderPrefs::load(&store),
            ReaderPrefs {
                theme: Theme::Dark,
                font_size: 24
            }
        );

        store.set(PREFS_KEY, "not json").unwrap();
        assert_eq!(ReaderPrefs::load(&store), ReaderPrefs::default());
    }
}
