//! Study Reader
//!
//! A static study reader: pre-built HTML chapter fragments with durable text
//! highlights, plus flashcard decks built from plain-text notes.
//!
//! # Modules
//!
//! - `dom`: fragment tree, HTML parsing/serialization and live ranges
//! - `anchor`: range <-> portable path descriptor codec
//! - `highlights`: highlight markers and the per-chapter highlight log
//! - `reader`: the chapter reader session
//! - `deck`: flashcard review
//! - `library`: chapter/deck indexes and their builders
//! - `content`, `storage`: where fragments and user state come from

pub mod anchor;
pub mod config;
pub mod content;
pub mod deck;
pub mod dom;
pub mod error;
pub mod highlights;
pub mod library;
pub mod reader;
pub mod routes;
pub mod state;
pub mod storage;
pub mod theme;
