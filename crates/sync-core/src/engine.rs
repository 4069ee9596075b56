//! Reconciliation of single documents against the remote service.
//!
//! The identifier store decides whether a document is new or already has a
//! remote object. Updates happen in place; a vanished remote object is
//! recreated and the mapping repointed, so the store never tracks stale IDs.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::change::{self, ChangeRecord, FileError};
use crate::session::{Session, SessionError};
use crate::store::IdStore;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// What a create-or-update did remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created(String),
    Updated(String),
    /// The tracked object was gone and a new one replaced it.
    Recreated(String),
}

impl SyncOutcome {
    pub fn object_id(&self) -> &str {
        match self {
            SyncOutcome::Created(id) | SyncOutcome::Updated(id) | SyncOutcome::Recreated(id) => id,
        }
    }
}

/// What a delete did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Deleted,
    /// The remote object was already gone; the mapping is dropped anyway.
    AlreadyGone,
    /// Nothing was mapped for this filename.
    Untracked,
}

pub struct SyncEngine {
    session: Arc<Session>,
    store: Arc<IdStore>,
    container_id: String,
}

impl SyncEngine {
    pub fn new(session: Arc<Session>, store: Arc<IdStore>, container_id: impl Into<String>) -> Self {
        Self {
            session,
            store,
            container_id: container_id.into(),
        }
    }

    pub fn store(&self) -> &IdStore {
        &self.store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Push the document at `path` to the remote service and record its ID.
    pub async fn sync_file(&self, path: &Path) -> Result<SyncOutcome, SyncError> {
        let change = change::extract(path).await?;
        info!("Syncing {}", change.filename);

        let outcome = self.upsert(&change).await?;
        self.record(&change.filename, outcome.object_id());

        info!("{} synced (ID: {})", change.filename, outcome.object_id());
        Ok(outcome)
    }

    async fn upsert(&self, change: &ChangeRecord) -> Result<SyncOutcome, SessionError> {
        let Some(existing) = self.store.get(&change.filename) else {
            return self.create(change).await.map(SyncOutcome::Created);
        };

        match self
            .session
            .update_object(&existing, &change.title, &change.content, &self.container_id)
            .await
        {
            Ok(()) => Ok(SyncOutcome::Updated(existing)),
            Err(e) if e.is_not_found() => {
                warn!(
                    "Object {} for {} no longer exists, creating a new one",
                    existing, change.filename
                );
                self.create(change).await.map(SyncOutcome::Recreated)
            }
            Err(e) => Err(e),
        }
    }

    async fn create(&self, change: &ChangeRecord) -> Result<String, SessionError> {
        self.session
            .create_object(&change.title, &change.content, &self.container_id)
            .await
    }

    /// Delete the remote object mapped to the document at `path`.
    ///
    /// The file itself is usually gone by now, so only the path is used.
    pub async fn remove_file(&self, path: &Path) -> Result<RemoveOutcome, SyncError> {
        let filename = change::filename_for(path)?;

        let Some(object_id) = self.store.get(&filename) else {
            debug!("{} has no remote object, nothing to delete", filename);
            return Ok(RemoveOutcome::Untracked);
        };

        let outcome = match self
            .session
            .delete_object(&object_id, &self.container_id)
            .await
        {
            Ok(()) => RemoveOutcome::Deleted,
            Err(e) if e.is_not_found() => {
                warn!("Object {} for {} was already deleted", object_id, filename);
                RemoveOutcome::AlreadyGone
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = self.store.remove(&filename) {
            error!("Failed to persist removal of {}: {}", filename, e);
        }

        info!("{} deleted from remote", filename);
        Ok(outcome)
    }

    /// Store failures leave the in-memory mapping updated and never fail
    /// the sync that triggered them.
    fn record(&self, filename: &str, object_id: &str) {
        if let Err(e) = self.store.set(filename, object_id) {
            error!("Failed to persist mapping for {}: {}", filename, e);
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("session", &self.session)
            .field("container_id", &self.container_id)
            .finish_non_exhaustive()
    }
}
