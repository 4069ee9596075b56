//! Consumer loop over filesystem events.
//!
//! Events are filtered to tracked documents, debounced per path, then turned
//! into create-or-update or delete calls on the [`SyncEngine`]. Which call is
//! made depends on whether the file exists at dispatch time, so a debounced
//! follow-up event cannot leave the remote side out of step with the disk.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::debounce::Debouncer;
use crate::engine::{RemoveOutcome, SyncEngine};
use crate::settings::SyncSettings;

/// Type of filesystem event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Create,
    Write,
    Remove,
}

/// File event from the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    /// Absolute path of the affected file
    pub path: PathBuf,
    pub kind: FsEventKind,
    /// When the watcher observed the event; debouncing compares these.
    pub at: Instant,
}

impl FsEvent {
    /// Event observed now.
    pub fn new(path: impl Into<PathBuf>, kind: FsEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
            at: Instant::now(),
        }
    }
}

/// Error reported by the watcher on the event channel.
#[derive(Debug, Clone, Error)]
#[error("watcher error: {0}")]
pub struct WatchError(pub String);

/// One item on the event channel.
pub type WatchMessage = Result<FsEvent, WatchError>;

/// What the dispatcher did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Not a tracked document.
    Ignored,
    /// Arrived inside the debounce window of an earlier event.
    Debounced,
    /// The file disappeared during the settle wait and was never synced.
    Vanished,
    Synced,
    Removed,
    /// The engine reported an error; already logged.
    Failed,
}

pub struct Dispatcher {
    engine: Arc<SyncEngine>,
    settings: SyncSettings,
    debouncer: Debouncer,
}

impl Dispatcher {
    pub fn new(engine: Arc<SyncEngine>, settings: SyncSettings) -> Self {
        let debouncer = Debouncer::new(settings.debounce);
        Self {
            engine,
            settings,
            debouncer,
        }
    }

    /// Consume events until the channel closes.
    ///
    /// Watcher errors are logged and skipped.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<WatchMessage>) {
        info!("Dispatcher started");

        while let Some(message) = events.recv().await {
            match message {
                Ok(event) => {
                    self.handle(event).await;
                }
                Err(e) => {
                    error!("{}", e);
                }
            }
        }

        info!("Event stream closed, dispatcher stopped");
    }

    /// Process a single event.
    pub async fn handle(&mut self, event: FsEvent) -> Dispatch {
        if !self.settings.tracks(&event.path) {
            return Dispatch::Ignored;
        }

        if !self.debouncer.accept(&event.path, event.at) {
            debug!("Dropping {:?} for {} (debounced)", event.kind, event.path.display());
            return Dispatch::Debounced;
        }

        match event.kind {
            FsEventKind::Create | FsEventKind::Write => self.on_changed(event).await,
            FsEventKind::Remove => self.on_removed(event).await,
        }
    }

    async fn on_changed(&self, event: FsEvent) -> Dispatch {
        // Let multi-write saves settle before reading.
        tokio::time::sleep(self.debouncer.window()).await;

        if !event.path.exists() {
            // The matching remove may have been debounced, so delete here.
            debug!("{} vanished before sync", event.path.display());
            return match self.engine.remove_file(&event.path).await {
                Ok(RemoveOutcome::Untracked) => Dispatch::Vanished,
                Ok(_) => Dispatch::Removed,
                Err(e) => {
                    warn!("Delete error for {}: {}", event.path.display(), e);
                    Dispatch::Failed
                }
            };
        }

        self.sync(&event).await
    }

    async fn on_removed(&self, event: FsEvent) -> Dispatch {
        // Atomic saves remove then recreate the path; a file that is back
        // is a change, not a delete.
        if event.path.exists() {
            debug!("{} still exists after remove, syncing", event.path.display());
            return self.sync(&event).await;
        }

        self.delete(&event).await
    }

    async fn sync(&self, event: &FsEvent) -> Dispatch {
        match self.engine.sync_file(&event.path).await {
            Ok(_) => Dispatch::Synced,
            Err(e) => {
                warn!("Sync error for {}: {}", event.path.display(), e);
                Dispatch::Failed
            }
        }
    }

    async fn delete(&self, event: &FsEvent) -> Dispatch {
        match self.engine.remove_file(&event.path).await {
            Ok(_) => Dispatch::Removed,
            Err(e) => {
                warn!("Delete error for {}: {}", event.path.display(), e);
                Dispatch::Failed
            }
        }
    }
}
