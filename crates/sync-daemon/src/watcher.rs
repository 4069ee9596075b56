//! Native filesystem watcher feeding the dispatcher's event channel.
//!
//! Raw notify events are translated into create/write/remove events and
//! stamped on arrival. Filtering and debouncing happen downstream.

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use sync_core::{FsEvent, FsEventKind, WatchError, WatchMessage};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Watches a directory tree for as long as it is alive.
pub struct DirectoryWatcher {
    root: PathBuf,
    /// Dropping the watcher stops event delivery
    _watcher: RecommendedWatcher,
}

impl DirectoryWatcher {
    /// Start watching `root` recursively.
    ///
    /// Returns the watcher handle and the receiving end of its event channel.
    /// The channel closes when the handle is dropped.
    pub fn start(
        root: &Path,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WatchMessage>), notify::Error> {
        // Event paths are reported against the resolved path (e.g. /private/var on macOS).
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    for fs_event in translate(event) {
                        if tx.send(Ok(fs_event)).is_err() {
                            // Receiver dropped
                            return;
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(WatchError(e.to_string())));
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!("Watching {}", root.display());

        Ok((
            Self {
                root,
                _watcher: watcher,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Map one raw notify event onto zero or more file events.
///
/// Renames become a remove of the old path and a create of the new one.
pub fn translate(event: Event) -> Vec<FsEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => Some(FsEventKind::Create),
        EventKind::Remove(_) => Some(FsEventKind::Remove),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(FsEventKind::Remove),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(FsEventKind::Create),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut paths = event.paths.into_iter();
            return match (paths.next(), paths.next()) {
                (Some(from), Some(to)) => vec![
                    FsEvent::new(from, FsEventKind::Remove),
                    FsEvent::new(to, FsEventKind::Create),
                ],
                _ => Vec::new(),
            };
        }
        EventKind::Modify(ModifyKind::Name(_)) | EventKind::Any => {
            return event.paths.into_iter().map(exists_or_removed).collect();
        }
        EventKind::Modify(_) => Some(FsEventKind::Write),
        EventKind::Access(_) | EventKind::Other => None,
    };

    match kind {
        Some(kind) => event
            .paths
            .into_iter()
            .map(|path| FsEvent::new(path, kind))
            .collect(),
        None => {
            debug!("Ignoring {:?}", event.kind);
            Vec::new()
        }
    }
}

/// Ambiguous events are resolved by whether the path is still there.
fn exists_or_removed(path: PathBuf) -> FsEvent {
    let kind = if path.exists() {
        FsEventKind::Write
    } else {
        FsEventKind::Remove
    };
    FsEvent::new(path, kind)
}
