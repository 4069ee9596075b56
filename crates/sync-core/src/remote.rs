//! RemoteTransport trait for the object service.
//!
//! Implementations:
//! - `HttpTransport` (in sync-daemon) - The service's local REST API
//! - `MockTransport` (in tests) - Records calls and replays scripted failures

use async_trait::async_trait;
use thiserror::Error;

/// Phrases that mark an otherwise unclassified error as an auth failure.
const AUTH_PHRASES: &[&str] = &[
    "not authenticated",
    "authentication failed",
    "invalid token",
    "session",
    "signature is invalid",
];

/// Classified failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("service unavailable - check if the service is running")]
    Unavailable,

    #[error("call timeout")]
    Timeout,

    #[error("not authenticated - check the session token")]
    Unauthenticated,

    #[error("permission denied - check credentials or space access")]
    PermissionDenied,

    #[error("space or object not found")]
    NotFound,

    #[error("invalid request: {0}")]
    InvalidArgument(String),

    #[error("service internal error: {0}")]
    Internal(String),

    #[error("not connected to the remote service")]
    NotConnected,

    #[error("remote error: {0}")]
    Unknown(String),
}

impl RemoteError {
    /// Whether this failure should trigger a credential refresh.
    ///
    /// Structured auth kinds always qualify. Messages carried by `Internal`
    /// and `Unknown` are matched against the known auth vocabulary, since
    /// some services report expired sessions through generic errors.
    pub fn is_auth_error(&self) -> bool {
        match self {
            RemoteError::Unauthenticated | RemoteError::PermissionDenied => true,
            RemoteError::Internal(message) | RemoteError::Unknown(message) => {
                let message = message.to_lowercase();
                AUTH_PHRASES.iter().any(|phrase| message.contains(phrase))
            }
            _ => false,
        }
    }

    /// Whether the caller may retry later without changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Unavailable | RemoteError::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, RemoteError>;

/// Request/response boundary to the remote object service.
///
/// `token` is the current session credential and is attached to every call.
/// A stale token only shows up as an auth error on the call itself.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Open a container so objects can be created in it. Idempotent.
    async fn open_container(&self, token: &str, container_id: &str) -> Result<()>;

    /// Create an object and return its ID.
    async fn create_object(
        &self,
        token: &str,
        title: &str,
        content: &str,
        container_id: &str,
    ) -> Result<String>;

    /// Replace the title and content of an existing object.
    async fn update_object(
        &self,
        token: &str,
        object_id: &str,
        title: &str,
        content: &str,
        container_id: &str,
    ) -> Result<()>;

    /// Delete objects by ID.
    async fn delete_objects(
        &self,
        token: &str,
        object_ids: &[String],
        container_id: &str,
    ) -> Result<()>;

    /// Cheap liveness probe.
    async fn health_check(&self, token: &str) -> Result<()>;
}
