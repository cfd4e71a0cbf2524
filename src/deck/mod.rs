//! Flashcard decks
//!
//! One paragraph of a source text file is one card. A topic can be reviewed
//! from any of its text sources, with the position remembered per source,
//! plus an image viewer over the topic's pictures.

mod cards;
mod progress;
mod session;

pub use cards::split_into_cards;
pub use progress::{progress_key, CardProgress, ProgressLog, PROGRESS_KEY};
pub use session::{pretty, DeckSession};

use crate::storage::{KeyValueStore, StoreError};
use crate::theme::ThemeMode;

/// Storage key of the deck theme choice (a bare string, not JSON)
pub const THEME_KEY: &str = "rd_theme_v1";

/// Saved theme mode; missing or unknown values mean `auto`
pub fn load_theme_mode<S: KeyValueStore + ?Sized>(store: &S) -> ThemeMode {
    match store.get(THEME_KEY) {
        Ok(Some(raw)) => ThemeMode::parse(&raw).unwrap_or_else(|| {
            tracing::debug!("Unknown theme mode {:?}, using auto", raw);
            ThemeMode::Auto
        }),
        Ok(None) => ThemeMode::Auto,
        Err(e) => {
            tracing::warn!("Failed to read theme mode: {}", e);
            ThemeMode::Auto
        }
    }
}

pub fn save_theme_mode<S: KeyValueStore + ?Sized>(store: &S, mode: ThemeMode) -> Result<(), StoreError> {
    store.set(THEME_KEY, mode.as_str())
}
