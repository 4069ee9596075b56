//! Credential refresh and the retry-once policy around remote calls.
//!
//! The controller owns the session token. When a wrapped call fails with an
//! auth error it runs the injected [`Reauthenticator`] under a single lock,
//! swaps in the fresh token and retries the call exactly once.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::credential::CredentialError;
use crate::remote;
use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("token refresh rate limited, next attempt allowed in {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("re-authentication failed: {0}")]
    Reauthenticate(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Out-of-band procedure that produces a fresh session token.
///
/// For a locally hosted service this typically restarts the service process
/// and re-reads its configuration once it has settled.
#[async_trait]
pub trait Reauthenticator: Send + Sync {
    async fn reauthenticate(&self) -> Result<String, RefreshError>;
}

/// Timing rules for refresh attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Minimum time between two refresh attempts, successful or not.
    pub cooldown: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Current token plus when it was last refreshed.
#[derive(Debug)]
struct Credential {
    token: String,
    last_refresh: Option<Instant>,
}

pub struct RefreshController {
    /// Held for the whole refresh so at most one runs process-wide.
    credential: Mutex<Credential>,
    reauth: Arc<dyn Reauthenticator>,
    policy: RefreshPolicy,
}

impl RefreshController {
    pub fn new(
        token: impl Into<String>,
        reauth: Arc<dyn Reauthenticator>,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            credential: Mutex::new(Credential {
                token: token.into(),
                last_refresh: None,
            }),
            reauth,
            policy,
        }
    }

    /// Current session token.
    pub async fn token(&self) -> String {
        self.credential.lock().await.token.clone()
    }

    /// Run the re-authentication procedure unless one ran within the cooldown.
    ///
    /// The attempt time is recorded even when re-authentication fails.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        let mut credential = self.credential.lock().await;

        if let Some(last) = credential.last_refresh {
            let elapsed = last.elapsed();
            if elapsed < self.policy.cooldown {
                warn!("Token refresh attempted too soon, skipping");
                return Err(RefreshError::RateLimited {
                    retry_after: self.policy.cooldown - elapsed,
                });
            }
        }

        info!("Attempting to refresh session token");
        let result = self.reauth.reauthenticate().await;
        credential.last_refresh = Some(Instant::now());

        let token = result?;
        credential.token = token;
        info!("Session token refreshed");
        Ok(())
    }

    /// Invoke `op` with the current token, refreshing and retrying once on an
    /// auth error.
    ///
    /// Non-auth errors are returned unchanged. If the refresh itself fails the
    /// result carries both the original error and the refresh failure. The
    /// retry's outcome is returned as-is; there is never a second retry.
    pub async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T, SessionError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = remote::Result<T>>,
    {
        let original = match op(self.token().await).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_auth_error() => return Err(SessionError::Remote(e)),
            Err(e) => e,
        };

        warn!("Authentication error detected: {}", original);

        if let Err(refresh) = self.refresh().await {
            error!("Token refresh failed: {}", refresh);
            return Err(SessionError::RefreshFailed { original, refresh });
        }

        info!("Retrying operation with refreshed token");
        op(self.token().await).await.map_err(SessionError::Remote)
    }
}

impl std::fmt::Debug for RefreshController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshController")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
