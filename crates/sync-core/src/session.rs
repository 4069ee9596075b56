//! Authenticated access to the remote object service.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::refresh::{RefreshController, RefreshError};
use crate::remote::{RemoteError, RemoteTransport};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Remote(RemoteError),

    #[error("auth error ({original}); token refresh failed: {refresh}")]
    RefreshFailed {
        original: RemoteError,
        refresh: RefreshError,
    },

    #[error("not connected to the remote service")]
    NotConnected,
}

impl SessionError {
    /// True when the remote side reported the object or container as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::Remote(RemoteError::NotFound))
    }
}

/// A live transport plus the credential used on it.
struct Link {
    transport: Arc<dyn RemoteTransport>,
    refresh: RefreshController,
}

/// Connection to the remote service.
///
/// A session built with [`Session::disconnected`] fails every call with
/// [`SessionError::NotConnected`], so the watcher can run while the service
/// is down.
pub struct Session {
    link: Option<Link>,
}

impl Session {
    pub fn connected(transport: Arc<dyn RemoteTransport>, refresh: RefreshController) -> Self {
        Self {
            link: Some(Link { transport, refresh }),
        }
    }

    pub fn disconnected() -> Self {
        Self { link: None }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    fn link(&self) -> Result<&Link, SessionError> {
        self.link.as_ref().ok_or(SessionError::NotConnected)
    }

    /// Open a container so objects can be created in it.
    pub async fn open_container(&self, container_id: &str) -> Result<(), SessionError> {
        let link = self.link()?;
        let transport = link.transport.as_ref();
        debug!("Opening container {}", container_id);

        link.refresh
            .with_retry(move |token| async move {
                transport.open_container(&token, container_id).await
            })
            .await
    }

    /// Create an object for a document and return its ID.
    pub async fn create_object(
        &self,
        title: &str,
        content: &str,
        container_id: &str,
    ) -> Result<String, SessionError> {
        let link = self.link()?;
        let transport = link.transport.as_ref();
        debug!("Creating object '{}' ({} bytes)", title, content.len());

        link.refresh
            .with_retry(move |token| async move {
                transport
                    .create_object(&token, title, content, container_id)
                    .await
            })
            .await
    }

    /// Replace the title and content of an existing object.
    pub async fn update_object(
        &self,
        object_id: &str,
        title: &str,
        content: &str,
        container_id: &str,
    ) -> Result<(), SessionError> {
        let link = self.link()?;
        let transport = link.transport.as_ref();
        debug!("Updating object {} as '{}'", object_id, title);

        link.refresh
            .with_retry(move |token| async move {
                transport
                    .update_object(&token, object_id, title, content, container_id)
                    .await
            })
            .await
    }

    /// Delete a single object.
    pub async fn delete_object(
        &self,
        object_id: &str,
        container_id: &str,
    ) -> Result<(), SessionError> {
        let link = self.link()?;
        let transport = link.transport.as_ref();
        let ids = [object_id.to_string()];
        let ids = &ids[..];
        debug!("Deleting object {}", object_id);

        link.refresh
            .with_retry(move |token| async move {
                transport.delete_objects(&token, ids, container_id).await
            })
            .await
    }

    /// Liveness probe. Not retried; callers treat failure as advisory.
    pub async fn health_check(&self) -> Result<(), SessionError> {
        let link = self.link()?;
        let token = link.refresh.token().await;
        link.transport
            .health_check(&token)
            .await
            .map_err(SessionError::Remote)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connected", &self.is_connected())
            .finish()
    }
}
