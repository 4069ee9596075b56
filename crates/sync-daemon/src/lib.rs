//! workspace-sync daemon: the native pieces around sync-core.
//!
//! This library layer exposes the transport, re-authentication and watcher
//! so integration tests can drive them directly.

pub mod config;
pub mod http;
pub mod reauth;
pub mod watcher;

pub use config::{Args, Config};
pub use http::HttpTransport;
pub use reauth::ProcessRestart;
pub use watcher::DirectoryWatcher;
