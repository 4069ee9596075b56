//! Turning a document on disk into a change record.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Heading marker that promotes a line to the document title.
const TITLE_MARKER: &str = "# ";

#[derive(Debug, Error)]
pub enum FileError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Path has no usable file name: {0}")]
    InvalidPath(PathBuf),
}

/// A single document about to be pushed to the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Full path of the source file
    pub path: PathBuf,
    /// Base name without extension; the key in the identifier store
    pub filename: String,
    /// First level-1 heading, or the filename
    pub title: String,
    /// Raw file contents
    pub content: String,
}

/// Derive the store key for a path: its base name with the extension removed.
pub fn filename_for(path: &Path) -> Result<String, FileError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| FileError::InvalidPath(path.to_path_buf()))
}

/// Extract the title from document text.
///
/// The first line starting with `# ` wins, with the marker stripped and the
/// rest of the line kept as-is. Returns `None` when no such line exists.
pub fn extract_title(content: &str) -> Option<&str> {
    content
        .lines()
        .find_map(|line| line.strip_prefix(TITLE_MARKER))
}

/// Read a document and build its change record.
pub async fn extract(path: &Path) -> Result<ChangeRecord, FileError> {
    let filename = filename_for(path)?;
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FileError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let title = extract_title(&content).unwrap_or(&filename).to_string();

    Ok(ChangeRecord {
        path: path.to_path_buf(),
        filename,
        title,
        content,
    })
}
