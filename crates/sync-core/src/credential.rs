//! Session credential read from the service's configuration file.

use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to read credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse credential file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Credential file {0} has no sessionToken")]
    MissingToken(PathBuf),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialFile {
    #[serde(default)]
    session_token: Option<String>,
}

/// Read the `sessionToken` field from a JSON configuration file.
pub fn read_session_token(path: &Path) -> Result<String, CredentialError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let file: CredentialFile =
        serde_json::from_str(&contents).map_err(|source| CredentialError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    file.session_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| CredentialError::MissingToken(path.to_path_buf()))
}
