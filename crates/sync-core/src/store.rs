//! Persistent mapping from local filename to remote object ID.
//!
//! The whole mapping is kept in memory and rewritten to a single JSON file
//! after every mutation. A missing file on startup means an empty mapping.

use serde_json::Error as JsonError;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access object map {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse object map {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: JsonError,
    },

    #[error("Failed to serialize object map: {0}")]
    Serialize(#[source] JsonError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Filename to remote object ID mapping backed by a JSON file.
///
/// Every entry names an object believed to exist remotely. Absence means the
/// file was never synced or has been deleted.
#[derive(Debug)]
pub struct IdStore {
    /// Path to the backing file.
    path: PathBuf,
    /// In-memory mapping (filename -> object ID).
    mapping: RwLock<BTreeMap<String, String>>,
}

impl IdStore {
    /// Open the store at `path`, loading any existing mapping.
    ///
    /// A missing file is not an error. Any other read or parse failure is.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mapping = Self::load(&path)?;
        debug!("Loaded {} object mapping(s) from {}", mapping.len(), path.display());

        Ok(Self {
            path,
            mapping: RwLock::new(mapping),
        })
    }

    fn load(path: &Path) -> Result<BTreeMap<String, String>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the remote object ID for a filename.
    pub fn get(&self, filename: &str) -> Option<String> {
        let mapping = self.mapping.read().unwrap_or_else(PoisonError::into_inner);
        mapping.get(filename).cloned()
    }

    /// Record `filename -> object_id` and flush to disk.
    ///
    /// On a flush failure the in-memory entry stays in place and the error
    /// is returned.
    pub fn set(&self, filename: &str, object_id: &str) -> Result<()> {
        let mut mapping = self.mapping.write().unwrap_or_else(PoisonError::into_inner);
        mapping.insert(filename.to_string(), object_id.to_string());
        self.save(&mapping)
    }

    /// Remove the entry for `filename` and flush to disk.
    pub fn remove(&self, filename: &str) -> Result<()> {
        let mut mapping = self.mapping.write().unwrap_or_else(PoisonError::into_inner);
        mapping.remove(filename);
        self.save(&mapping)
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.mapping.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current mapping.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.mapping.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Write the mapping next to the target and rename it into place.
    fn save(&self, mapping: &BTreeMap<String, String>) -> Result<()> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let contents = serde_json::to_string_pretty(mapping).map_err(StoreError::Serialize)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, contents).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}
