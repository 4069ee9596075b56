//! Startup sweep over documents that already exist in the watch root.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::change;
use crate::engine::SyncEngine;
use crate::settings::SyncSettings;

#[derive(Debug, Error)]
#[error("Failed to read watch directory {path}: {source}")]
pub struct BootstrapError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Counts from one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    pub synced: usize,
    pub failed: usize,
}

/// Sync every tracked document under `root`, one at a time.
///
/// Per-file failures are logged and counted. Only failing to list `root`
/// itself is an error.
pub async fn initial_sync(
    root: &Path,
    engine: &SyncEngine,
    settings: &SyncSettings,
) -> Result<BootstrapReport, BootstrapError> {
    info!("Running initial sync of {}", root.display());

    let files = collect_documents(root, settings).await?;
    for key in shared_keys(&files) {
        warn!(
            "Several documents are named {}; they share one remote object",
            key
        );
    }
    let mut report = BootstrapReport::default();

    for path in files {
        match engine.sync_file(&path).await {
            Ok(_) => report.synced += 1,
            Err(e) => {
                warn!("Initial sync failed for {}: {}", path.display(), e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Initial sync complete: {} synced, {} failed",
        report.synced, report.failed
    );
    Ok(report)
}

/// List tracked documents, sorted for a stable order.
///
/// With `settings.recursive`, unreadable subdirectories are skipped with a
/// warning.
async fn collect_documents(
    root: &Path,
    settings: &SyncSettings,
) -> Result<Vec<PathBuf>, BootstrapError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match list_dir(&dir).await {
            Ok(entries) => entries,
            Err(source) if dir == root => {
                return Err(BootstrapError {
                    path: dir,
                    source,
                });
            }
            Err(e) => {
                warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                continue;
            }
        };

        for (path, is_dir) in entries {
            if is_dir {
                if settings.recursive && !is_hidden(&path) {
                    pending.push(path);
                }
            } else if settings.tracks(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

async fn list_dir(dir: &Path) -> io::Result<Vec<(PathBuf, bool)>> {
    let mut entries = Vec::new();
    let mut reader = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = reader.next_entry().await? {
        let is_dir = entry.file_type().await?.is_dir();
        entries.push((entry.path(), is_dir));
    }

    Ok(entries)
}

/// Mapping keys claimed by more than one document.
///
/// Keys are basenames, so this only happens in a recursive sweep.
fn shared_keys(files: &[PathBuf]) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for key in files.iter().filter_map(|path| change::filename_for(path).ok()) {
        *counts.entry(key).or_default() += 1;
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(key, _)| key)
        .collect()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}
