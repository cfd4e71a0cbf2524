//! Filesystem-backed content store

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::{ContentError, ContentStore};

/// Reads fragments from a web root directory
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a web URL onto a file below the root.
    ///
    /// Query strings and fragments are dropped and percent escapes decoded;
    /// anything that would leave the root is rejected.
    pub fn resolve(&self, url: &str) -> Result<PathBuf, ContentError> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let decoded = urlencoding::decode(path)
            .map_err(|_| ContentError::InvalidPath(url.to_string()))?;
        let relative = decoded.trim_start_matches('/');

        let mut resolved = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return Err(ContentError::InvalidPath(url.to_string())),
            }
        }
        if resolved == self.root {
            return Err(ContentError::InvalidPath(url.to_string()));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn fetch(&self, url: &str) -> Result<String, ContentError> {
        let path = self.resolve(url)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(html) => Ok(html),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ContentError::NotFound(url.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fetch_fragment() {
        let dir = TempDir::new().unwrap();
        let chapter_dir = dir.path().join("build/content/fa/renal");
        std::fs::create_dir_all(&chapter_dir).unwrap();
        std::fs::write(chapter_dir.join("acid base.html"), "<h1>Acid base</h1>").unwrap();

        let store = FsContentStore::new(dir.path());
        let html = store
            .fetch("build/content/fa/renal/acid%20base.html?v=2")
            .await
            .unwrap();

        assert_eq!(html, "<h1>Acid base</h1>");
    }

    #[tokio::test]
    async fn test_fetch_missing() {
        let dir = TempDir::new().unwrap();
        let store = FsContentStore::new(dir.path());

        let err = store.fetch("build/content/nope.html").await.unwrap_err();
        assert!(matches!(err, ContentError::NotFound(_)));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = FsContentStore::new("/srv/reader");

        assert!(matches!(
            store.resolve("../secret.txt"),
            Err(ContentError::InvalidPath(_))
        ));
        assert!(matches!(
            store.resolve("build/%2e%2e/%2e%2e/etc/passwd"),
            Err(ContentError::InvalidPath(_))
        ));
        assert!(matches!(store.resolve(""), Err(ContentError::InvalidPath(_))));
        assert_eq!(
            store.resolve("/build/./a.html").unwrap(),
            PathBuf::from("/srv/reader/build/a.html")
        );
    }
}
