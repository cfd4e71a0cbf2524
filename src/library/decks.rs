//! Deck index builder
//!
//! Layout under the deck root:
//!
//! ```text
//! quick/<system>/<topic>.txt      quick/<system>/<topic>2.txt
//! firstaid/<system>/<topic>.txt   pathoma/<system>/<topic>.txt
//! images/<system>/<topic>.png     images/<system>/<topic>2.jpg
//! ```
//!
//! A trailing number on the file stem is the part number (missing means 1).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use regex::Regex;
use walkdir::WalkDir;

use super::manifest::{DeckIndex, DeckSource, DeckTopic};
use super::LibraryError;

const IMAGE_EXTS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];
const IMAGES_DIR: &str = "images";

#[derive(Debug, Clone, Copy)]
enum Kind {
    Text(DeckSource),
    Images,
}

impl Kind {
    fn dir(self) -> &'static str {
        match self {
            Kind::Text(source) => source.key(),
            Kind::Images => IMAGES_DIR,
        }
    }

    fn accepts(self, ext: &str) -> bool {
        match self {
            Kind::Text(_) => ext == "txt",
            Kind::Images => IMAGE_EXTS.contains(&ext),
        }
    }
}

/// Scans a deck root and produces the deck index
pub struct DeckScanner {
    root: PathBuf,
    part_pattern: Regex,
}

impl DeckScanner {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, LibraryError> {
        Ok(Self {
            root: root.into(),
            part_pattern: Regex::new(r"^(.*?)(\d+)?$")?,
        })
    }

    /// Split a file stem into topic name and part number
    pub fn parse_base_part<'a>(&self, stem: &'a str) -> (&'a str, u32) {
        let Some(caps) = self.part_pattern.captures(stem) else {
            return (stem, 1);
        };
        let base = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|base| !base.is_empty())
            .unwrap_or(stem);
        let part = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1);
        (base, part)
    }

    /// Walk every source folder. Missing folders are skipped; topics and
    /// systems without any files are left out.
    pub fn scan(&self) -> Result<DeckIndex, LibraryError> {
        let mut index = DeckIndex {
            version: DeckIndex::VERSION,
            generated_at: Utc::now(),
            systems: BTreeMap::new(),
        };

        let kinds = DeckSource::ALL
            .into_iter()
            .map(Kind::Text)
            .chain(std::iter::once(Kind::Images));
        for kind in kinds {
            let dir = self.root.join(kind.dir());
            if !dir.is_dir() {
                tracing::info!("{} folder missing, skipped", kind.dir());
                continue;
            }
            for system_dir in list_entries(&dir, true)? {
                self.scan_system(&mut index, kind, &system_dir)?;
            }
        }

        for topics in index.systems.values_mut() {
            topics.retain(|_, topic| !topic.sources.is_empty());
        }
        index.systems.retain(|_, topics| !topics.is_empty());

        Ok(index)
    }

    fn scan_system(&self, index: &mut DeckIndex, kind: Kind, dir: &Path) -> Result<(), LibraryError> {
        let system = file_name(dir);
        let files = list_entries(dir, false)?;
        tracing::debug!("{}/{}: {} file(s)", kind.dir(), system, files.len());

        let mut topics: BTreeMap<String, Vec<(u32, String)>> = BTreeMap::new();
        for file in files {
            let ext = file
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if !kind.accepts(&ext) {
                continue;
            }
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let (base, part) = self.parse_base_part(&stem);
            topics
                .entry(base.to_string())
                .or_default()
                .push((part, self.web_path(&file)));
        }

        for (topic, mut parts) in topics {
            parts.sort_by_key(|(part, _)| *part);
            let paths = parts.into_iter().map(|(_, path)| path).collect();
            let entry: &mut DeckTopic = index
                .systems
                .entry(system.clone())
                .or_default()
                .entry(topic)
                .or_default();
            match kind {
                Kind::Text(source) => *entry.sources.files_mut(source) = paths,
                Kind::Images => entry.sources.images = paths,
            }
        }
        Ok(())
    }

    /// Scan and write the index to `out_file`
    pub fn write(&self, out_file: &Path) -> Result<DeckIndex, LibraryError> {
        let index = self.scan()?;
        if let Some(parent) = out_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(out_file, serde_json::to_string_pretty(&index)?)?;

        tracing::info!(
            "Wrote {} ({} systems, {} topics)",
            out_file.display(),
            index.systems.len(),
            index.topic_count()
        );
        Ok(index)
    }

    fn web_path(&self, file: &Path) -> String {
        let relative = file.strip_prefix(&self.root).unwrap_or(file);
        relative
            .iter()
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Immediate children of `dir` that are directories (or files), sorted
fn list_entries(dir: &Path, dirs: bool) -> Result<Vec<PathBuf>, LibraryError> {
    let mut entries = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        let wanted = if dirs {
            entry.file_type().is_dir()
        } else {
            entry.file_type().is_file()
        };
        if wanted {
            entries.push(entry.into_path());
        }
    }
    Ok(entries)
}
