//! Configuration management for the study reader

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub content: ContentConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Where the published site and its inputs live
#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Web root served to the reader
    pub root: PathBuf,
    /// Chapter index, relative to the web root
    pub chapter_index: PathBuf,
    /// Deck index, relative to the deck root
    pub deck_index: PathBuf,
    /// `.docx` sources for the chapter builder
    pub sources_dir: PathBuf,
    /// Root holding `quick/`, `firstaid/`, `pathoma/` and `images/`
    pub decks_dir: PathBuf,
}

impl ContentConfig {
    pub fn chapter_index_path(&self) -> PathBuf {
        self.root.join(&self.chapter_index)
    }

    pub fn deck_index_path(&self) -> PathBuf {
        self.decks_dir.join(&self.deck_index)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON file backing reader state (highlights, scroll, preferences)
    pub state_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            content: ContentConfig {
                root: PathBuf::from("."),
                chapter_index: PathBuf::from("index.json"),
                deck_index: PathBuf::from("app/index.json"),
                sources_dir: PathBuf::from("sources"),
                decks_dir: PathBuf::from("."),
            },
            storage: StorageConfig {
                state_file: PathBuf::from("reader-state.json"),
            },
        }
    }
}

/// `name` if set, `default` if unset; non-UTF-8 values are an error
fn var_or(name: &str, default: &str) -> Result<String, env::VarError> {
    match env::var(name) {
        Ok(value) => Ok(value),
        Err(env::VarError::NotPresent) => Ok(default.to_string()),
        Err(e) => Err(e),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let root = var_or("CONTENT_ROOT", ".")?;
        Ok(Config {
            server: ServerConfig {
                host: var_or("SERVER_HOST", "0.0.0.0")?,
                port: var_or("SERVER_PORT", "3000")?.parse().unwrap_or(3000),
            },
            content: ContentConfig {
                root: PathBuf::from(&root),
                chapter_index: PathBuf::from(var_or("CHAPTER_INDEX", "index.json")?),
                deck_index: PathBuf::from(var_or("DECK_INDEX", "app/index.json")?),
                sources_dir: PathBuf::from(var_or("SOURCES_DIR", "sources")?),
                decks_dir: PathBuf::from(var_or("DECKS_DIR", &root)?),
            },
            storage: StorageConfig {
                state_file: PathBuf::from(var_or("STATE_FILE", "reader-state.json")?),
            },
        })
    }
}
