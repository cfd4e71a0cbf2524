//! Study library: the JSON indexes the reader and the deck app load, and the
//! offline builders that produce them.
//!
//! Chapter fragments come from `.docx` sources converted to HTML; decks are
//! plain-text card files plus images laid out by system and topic.

mod chapters;
mod decks;
mod manifest;

pub use chapters::{slugify, ChapterBuilder, DocumentConverter, PandocConverter};
pub use decks::DeckScanner;
pub use manifest::*;

use thiserror::Error;

/// Errors raised while building or loading indexes
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Conversion of {path} failed: {message}")]
    Conversion { path: String, message: String },
}
