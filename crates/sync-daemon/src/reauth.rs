//! Re-authentication by restarting the local service process.
//!
//! The service writes a new session token to its configuration file when it
//! starts, so a restart followed by a re-read yields a fresh credential.

use async_trait::async_trait;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use sync_core::{Reauthenticator, RefreshError, read_session_token};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Pause after stopping the old process.
const STOP_WAIT: Duration = Duration::from_secs(3);

/// Pause after starting the new process, before re-reading the token.
const START_WAIT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone)]
pub struct ProcessRestart {
    binary: PathBuf,
    credential_file: PathBuf,
    log_file: PathBuf,
    stop_wait: Duration,
    start_wait: Duration,
}

impl ProcessRestart {
    pub fn new(binary: impl Into<PathBuf>, credential_file: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            credential_file: credential_file.into(),
            log_file: std::env::temp_dir().join("anytype-serve.log"),
            stop_wait: STOP_WAIT,
            start_wait: START_WAIT,
        }
    }

    pub fn with_waits(mut self, stop_wait: Duration, start_wait: Duration) -> Self {
        self.stop_wait = stop_wait;
        self.start_wait = start_wait;
        self
    }

    pub fn with_log_file(mut self, log_file: impl Into<PathBuf>) -> Self {
        self.log_file = log_file.into();
        self
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Ask any running instance to exit. Having nothing to stop is fine.
    async fn stop(&self) {
        let name = self
            .binary
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.binary.display().to_string());
        let pattern = format!("{name} serve");

        match Command::new("pkill").args(["-f", &pattern]).status().await {
            Ok(status) => debug!("pkill -f {:?} exited with {}", pattern, status),
            Err(e) => warn!("Failed to run pkill: {}", e),
        }
    }

    fn start(&self) -> Result<(), RefreshError> {
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .map_err(|e| {
                RefreshError::Reauthenticate(format!(
                    "cannot open {}: {}",
                    self.log_file.display(),
                    e
                ))
            })?;
        let log_err = log
            .try_clone()
            .map_err(|e| RefreshError::Reauthenticate(e.to_string()))?;

        Command::new(&self.binary)
            .args(["serve", "-q"])
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .map_err(|e| {
                RefreshError::Reauthenticate(format!(
                    "cannot start {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        Ok(())
    }
}

#[async_trait]
impl Reauthenticator for ProcessRestart {
    async fn reauthenticate(&self) -> Result<String, RefreshError> {
        info!("Restarting {} to obtain a new session", self.binary.display());

        self.stop().await;
        tokio::time::sleep(self.stop_wait).await;

        self.start()?;
        tokio::time::sleep(self.start_wait).await;

        let token = read_session_token(&self.credential_file)?;
        info!("Read new session token from {}", self.credential_file.display());
        Ok(token)
    }
}
