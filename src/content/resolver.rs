//! Maps request paths to files under the content root.
//!
//! # Responsibilities
//! - Reject paths that could escape the content root
//! - Resolve directories to their `index.html`
//! - Read the file and pull the page title out of the first `<h1>`
//!
//! # Design Decisions
//! - Nothing is cached; every request stats and reads the file again
//! - Symlinks are not followed when deciding file vs. directory

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

const INDEX_FILE: &str = "index.html";

/// A resolved content page.
#[derive(Debug, Clone)]
pub struct ContentFile {
    /// Path relative to the content root, as used in page titles.
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub data: Vec<u8>,
    /// Inner text of the first `<h1>`, if any.
    pub title: Option<String>,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("path {0:?} escapes the content root")]
    Traversal(String),

    #[error("lstat {}: {source}", path.display())]
    Stat {
        rel_path: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is a directory", path.display())]
    Directory { rel_path: String, path: PathBuf },

    #[error("read {}: {source}", path.display())]
    Read {
        rel_path: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ContentError {
    /// Path shown in the error page title.
    pub fn page_path(&self) -> String {
        match self {
            ContentError::Traversal(rel) => rel.clone(),
            ContentError::Stat { rel_path, .. }
            | ContentError::Directory { rel_path, .. }
            | ContentError::Read { rel_path, .. } => rel_path.clone(),
        }
    }

    /// Traversal attempts are client errors; everything else is "not found".
    pub fn is_traversal(&self) -> bool {
        matches!(self, ContentError::Traversal(_))
    }
}

/// Resolves relative request paths under `<root>/content`.
#[derive(Debug, Clone)]
pub struct ContentResolver {
    content_root: PathBuf,
}

impl ContentResolver {
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
        }
    }

    /// Join `rel_path` onto the content root, refusing anything that is not
    /// a plain relative path.
    fn join(&self, rel_path: &str) -> Result<PathBuf, ContentError> {
        if rel_path.contains("..") {
            return Err(ContentError::Traversal(rel_path.to_string()));
        }
        let mut path = self.content_root.clone();
        for component in Path::new(rel_path).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return Err(ContentError::Traversal(rel_path.to_string())),
            }
        }
        Ok(path)
    }

    /// Resolve and read the page for `rel_path` (the request path without
    /// its leading slash).
    pub async fn resolve(&self, rel_path: &str) -> Result<ContentFile, ContentError> {
        let mut rel_path = rel_path.to_string();
        let mut abs_path = self.join(&rel_path)?;

        let mut meta = stat(&rel_path, &abs_path).await?;
        if meta.is_dir() {
            rel_path = if rel_path.is_empty() || rel_path.ends_with('/') {
                format!("{}{}", rel_path, INDEX_FILE)
            } else {
                format!("{}/{}", rel_path, INDEX_FILE)
            };
            abs_path = self.join(&rel_path)?;
            meta = stat(&rel_path, &abs_path).await?;
            if meta.is_dir() {
                return Err(ContentError::Directory {
                    rel_path,
                    path: abs_path,
                });
            }
        }

        let data = tokio::fs::read(&abs_path)
            .await
            .map_err(|source| ContentError::Read {
                rel_path: rel_path.clone(),
                path: abs_path.clone(),
                source,
            })?;
        let title = extract_title(&data);

        Ok(ContentFile {
            rel_path,
            abs_path,
            data,
            title,
        })
    }
}

async fn stat(rel_path: &str, path: &Path) -> Result<std::fs::Metadata, ContentError> {
    tokio::fs::symlink_metadata(path)
        .await
        .map_err(|source| ContentError::Stat {
            rel_path: rel_path.to_string(),
            path: path.to_path_buf(),
            source,
        })
}

/// Inner text of the first `<h1>...</h1>` whose body is non-empty and free of
/// markup.
pub fn extract_title(data: &[u8]) -> Option<String> {
    const OPEN: &[u8] = b"<h1>";
    const CLOSE: &[u8] = b"</h1>";

    let mut start = 0;
    while let Some(pos) = find(&data[start..], OPEN) {
        let text_start = start + pos + OPEN.len();
        let rest = &data[text_start..];
        let text_len = rest.iter().position(|&b| b == b'<').unwrap_or(rest.len());
        if text_len > 0 && rest[text_len..].starts_with(CLOSE) {
            return Some(String::from_utf8_lossy(&rest[..text_len]).into_owned());
        }
        start = text_start;
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
