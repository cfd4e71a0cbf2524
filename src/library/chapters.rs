//! Chapter builder
//!
//! Converts `sources/<source>/<system>/<name>.docx` into HTML fragments under
//! `build/content/`, extracts embedded images under `build/media/`, and writes
//! the chapter index at the web root.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use tokio::process::Command;
use walkdir::WalkDir;

use super::manifest::{ChapterIndex, ChapterItem};
use super::LibraryError;

const CONTENT_DIR: &str = "build/content";
const MEDIA_DIR: &str = "build/media";
const INDEX_FILE: &str = "index.json";

/// Turns one source document into an HTML fragment
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert `input`, extracting embedded media into `media_dir`
    async fn convert(&self, input: &Path, media_dir: &Path) -> Result<String, LibraryError>;
}

/// Converter backed by the `pandoc` executable
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: PathBuf,
}

impl Default for PandocConverter {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pandoc"),
        }
    }
}

impl PandocConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl DocumentConverter for PandocConverter {
    async fn convert(&self, input: &Path, media_dir: &Path) -> Result<String, LibraryError> {
        let output = Command::new(&self.program)
            .arg(input)
            .args(["-f", "docx", "-t", "html", "--wrap=none"])
            .arg(format!("--extract-media={}", media_dir.display()))
            .output()
            .await?;

        if !output.status.success() {
            return Err(LibraryError::Conversion {
                path: input.display().to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        String::from_utf8(output.stdout).map_err(|e| LibraryError::Conversion {
            path: input.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Lowercase, strip a `.docx` suffix, collapse non-alphanumeric runs to `_`
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    let stem = lower.strip_suffix(".docx").unwrap_or(&lower);

    let mut slug = String::with_capacity(stem.len());
    let mut pending_sep = false;
    for c in stem.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }
    slug
}

fn strip_docx(name: &str) -> Option<&str> {
    let cut = name.len().checked_sub(".docx".len())?;
    let (stem, ext) = (name.get(..cut)?, name.get(cut..)?);
    ext.eq_ignore_ascii_case(".docx").then_some(stem)
}

/// Builds chapter fragments and `index.json`
pub struct ChapterBuilder<C> {
    sources_dir: PathBuf,
    web_root: PathBuf,
    converter: C,
    media_src: Regex,
}

impl<C: DocumentConverter> ChapterBuilder<C> {
    pub fn new(
        sources_dir: impl Into<PathBuf>,
        web_root: impl Into<PathBuf>,
        converter: C,
    ) -> Result<Self, LibraryError> {
        Ok(Self {
            sources_dir: sources_dir.into(),
            web_root: web_root.into(),
            converter,
            media_src: Regex::new(r#"src="[^"]*?(media/[^"]+)""#)?,
        })
    }

    /// Point every image `src` that contains `media/...` at `build/media/...`
    pub fn normalize_media_src(&self, html: &str) -> String {
        self.media_src
            .replace_all(html, |caps: &Captures| {
                format!(r#"src="build/{}""#, caps[1].replace('\\', "/"))
            })
            .into_owned()
    }

    /// Convert every source document and write the chapter index.
    ///
    /// A document that fails to convert is logged and left out.
    pub async fn build(&self) -> Result<ChapterIndex, LibraryError> {
        tracing::info!("Building chapters from {}", self.sources_dir.display());
        let start = std::time::Instant::now();

        let content_root = self.web_root.join(CONTENT_DIR);
        let media_root = self.web_root.join(MEDIA_DIR);
        tokio::fs::create_dir_all(&content_root).await?;
        tokio::fs::create_dir_all(&media_root).await?;

        let mut items = Vec::new();
        for path in self.source_documents()? {
            match self.build_chapter(&path, &content_root, &media_root).await {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        items.sort_by_cached_key(|item| {
            (
                item.source.to_lowercase(),
                item.system.to_lowercase(),
                item.title.to_lowercase(),
            )
        });

        let index = ChapterIndex {
            generated: Utc::now(),
            items,
        };
        let index_path = self.web_root.join(INDEX_FILE);
        tokio::fs::write(&index_path, serde_json::to_string_pretty(&index)?).await?;

        tracing::info!(
            "Built {} chapters in {:?}, wrote {}",
            index.items.len(),
            start.elapsed(),
            index_path.display()
        );
        Ok(index)
    }

    fn source_documents(&self) -> Result<Vec<PathBuf>, LibraryError> {
        let mut documents = Vec::new();
        for entry in WalkDir::new(&self.sources_dir).sort_by_file_name() {
            let entry = entry?;
            let is_docx = entry
                .file_name()
                .to_str()
                .and_then(strip_docx)
                .is_some();
            if entry.file_type().is_file() && is_docx {
                documents.push(entry.into_path());
            }
        }
        Ok(documents)
    }

    async fn build_chapter(
        &self,
        path: &Path,
        content_root: &Path,
        media_root: &Path,
    ) -> Result<ChapterItem, LibraryError> {
        let relative = path.strip_prefix(&self.sources_dir).unwrap_or(path);
        let parts: Vec<String> = relative
            .iter()
            .map(|part| part.to_string_lossy().into_owned())
            .collect();
        let (dirs, file_name) = match parts.split_last() {
            Some((file_name, dirs)) => (dirs, file_name.as_str()),
            None => (&parts[..], ""),
        };
        let source = dirs.first().map(String::as_str).unwrap_or("unknown");
        let system = dirs.get(1).map(String::as_str).unwrap_or("misc");
        let title = strip_docx(file_name).unwrap_or(file_name);
        let slug = slugify(file_name);

        let out_dir = content_root.join(source).join(system);
        let media_dir = media_root.join(source).join(system).join(&slug);
        tokio::fs::create_dir_all(&out_dir).await?;
        tokio::fs::create_dir_all(&media_dir).await?;

        let html = self.converter.convert(path, &media_dir).await?;
        let fragment = format!(
            "<h1>{}</h1>\n{}",
            html_escape::encode_quoted_attribute(title),
            self.normalize_media_src(&html)
        );
        tokio::fs::write(out_dir.join(format!("{}.html", slug)), fragment).await?;

        let modified = tokio::fs::metadata(path).await?.modified()?;
        tracing::debug!("Converted {} -> {}/{}/{}", file_name, source, system, slug);

        Ok(ChapterItem {
            source: source.to_string(),
            system: system.to_string(),
            title: title.to_string(),
            url: format!("{}/{}/{}/{}.html", CONTENT_DIR, source, system, slug),
            slug,
            updated: DateTime::<Utc>::from(modified),
        })
    }
}
