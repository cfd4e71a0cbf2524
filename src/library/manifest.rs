//! Index file formats
//!
//! `index.json` at the web root lists chapters; `app/index.json` lists deck
//! files per system and topic. Both are written by the builders in this
//! module and read back by the reader and deck sessions.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LibraryError;

/// One chapter fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterItem {
    pub source: String,
    pub system: String,
    pub title: String,
    pub slug: String,
    /// Web-root-relative fragment URL, also the highlight log key
    pub url: String,
    /// Modification time of the source document
    pub updated: DateTime<Utc>,
}

impl ChapterItem {
    /// `YYYY-MM-DD` of the last source update
    pub fn updated_date(&self) -> String {
        self.updated.format("%Y-%m-%d").to_string()
    }

    fn matches(&self, needle: &str) -> bool {
        format!("{} {} {}", self.source, self.system, self.title)
            .to_lowercase()
            .contains(needle)
    }
}

/// Chapter listing (`index.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterIndex {
    pub generated: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<ChapterItem>,
}

/// Chapters sharing a source and system, as listed in the navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterGroup<'a> {
    pub source: &'a str,
    pub system: &'a str,
    pub items: Vec<&'a ChapterItem>,
}

impl ChapterGroup<'_> {
    pub fn label(&self) -> String {
        format!("{} / {}", self.source, self.system)
    }
}

impl ChapterIndex {
    pub fn find(&self, url: &str) -> Option<&ChapterItem> {
        self.items.iter().find(|item| item.url == url)
    }

    /// Items whose source, system or title contain `query`, ignoring case.
    /// A blank query matches everything.
    pub fn search(&self, query: &str) -> Vec<&ChapterItem> {
        let needle = query.trim().to_lowercase();
        self.items
            .iter()
            .filter(|item| needle.is_empty() || item.matches(&needle))
            .collect()
    }

    /// Group `items` by source and system. Groups are sorted; items keep
    /// their order.
    pub fn grouped<'a>(items: &[&'a ChapterItem]) -> Vec<ChapterGroup<'a>> {
        let mut groups: BTreeMap<(&'a str, &'a str), Vec<&'a ChapterItem>> = BTreeMap::new();
        for &item in items {
            groups
                .entry((item.source.as_str(), item.system.as_str()))
                .or_default()
                .push(item);
        }
        groups
            .into_iter()
            .map(|((source, system), items)| ChapterGroup {
                source,
                system,
                items,
            })
            .collect()
    }

    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// The three text sources a topic can be reviewed from, in preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeckSource {
    Quick,
    FirstAid,
    Pathoma,
}

impl DeckSource {
    pub const ALL: [DeckSource; 3] = [DeckSource::Quick, DeckSource::FirstAid, DeckSource::Pathoma];

    /// Folder name and JSON key
    pub fn key(self) -> &'static str {
        match self {
            DeckSource::Quick => "quick",
            DeckSource::FirstAid => "firstaid",
            DeckSource::Pathoma => "pathoma",
        }
    }
}

/// Files backing one topic, ordered by part number
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSources {
    #[serde(default)]
    pub quick: Vec<String>,
    #[serde(default)]
    pub firstaid: Vec<String>,
    #[serde(default)]
    pub pathoma: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl DeckSources {
    pub fn files(&self, source: DeckSource) -> &[String] {
        match source {
            DeckSource::Quick => &self.quick,
            DeckSource::FirstAid => &self.firstaid,
            DeckSource::Pathoma => &self.pathoma,
        }
    }

    pub(crate) fn files_mut(&mut self, source: DeckSource) -> &mut Vec<String> {
        match source {
            DeckSource::Quick => &mut self.quick,
            DeckSource::FirstAid => &mut self.firstaid,
            DeckSource::Pathoma => &mut self.pathoma,
        }
    }

    /// First text source with any files
    pub fn first_available(&self) -> Option<DeckSource> {
        DeckSource::ALL
            .into_iter()
            .find(|&source| !self.files(source).is_empty())
    }

    pub fn is_empty(&self) -> bool {
        DeckSource::ALL
            .iter()
            .all(|&source| self.files(source).is_empty())
            && self.images.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckTopic {
    #[serde(default)]
    pub sources: DeckSources,
}

/// Deck listing (`app/index.json`): system -> topic -> sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckIndex {
    pub version: u32,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub systems: BTreeMap<String, BTreeMap<String, DeckTopic>>,
}

impl DeckIndex {
    pub const VERSION: u32 = 1;

    pub fn topic(&self, system: &str, topic: &str) -> Option<&DeckTopic> {
        self.systems.get(system)?.get(topic)
    }

    pub fn topic_count(&self) -> usize {
        self.systems.values().map(BTreeMap::len).sum()
    }

    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
