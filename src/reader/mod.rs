//! Chapter reader
//!
//! [`ReaderSession`] owns the rendered chapter and ties the pieces together:
//! content fetching, URL rebasing, highlight restoration on open, creating
//! and clearing highlights, and the small amount of per-user state (last
//! chapter, scroll offsets, display preferences).

mod prefs;
mod session;

pub use prefs::{scroll_key, LastChapter, ReaderPrefs, LAST_KEY, PREFS_KEY};
pub use session::{OpenTicket, ReaderSession, CONTAINER_TAG};
