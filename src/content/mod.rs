//! Chapter content: where fragments come from and how they are prepared
//! before injection.

mod fs;
mod rewrite;

pub use fs::FsContentStore;
pub use rewrite::{chapter_base_dir, is_relative_url, rewrite_relative_urls};

use async_trait::async_trait;
use thiserror::Error;

/// Errors fetching or preparing chapter content
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Invalid content path: {0}")]
    InvalidPath(String),

    #[error("HTML rewrite failed: {0}")]
    Rewrite(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of pre-built chapter fragments, addressed by web-root-relative URL
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the HTML fragment stored at `url`
    async fn fetch(&self, url: &str) -> Result<String, ContentError>;
}
