//! sync-core: Change-synchronization engine for a watched document directory.
//!
//! This crate provides the core functionality for:
//! - Persisting the filename -> remote object ID mapping
//! - Extracting change records from documents on disk
//! - Authenticated remote calls with credential refresh and a single retry
//! - Debouncing filesystem events and dispatching create/update/delete
//! - Sweeping existing documents at startup
//!
//! The concrete transport, re-authentication procedure and filesystem
//! watcher are supplied by the caller through [`RemoteTransport`],
//! [`Reauthenticator`] and a channel of [`WatchMessage`]s.

pub mod bootstrap;
pub mod change;
pub mod credential;
pub mod debounce;
pub mod dispatcher;
pub mod engine;
pub mod refresh;
pub mod remote;
pub mod session;
pub mod settings;
pub mod store;

pub use bootstrap::{BootstrapError, BootstrapReport, initial_sync};
pub use change::{ChangeRecord, FileError};
pub use credential::{CredentialError, read_session_token};
pub use debounce::Debouncer;
pub use dispatcher::{Dispatch, Dispatcher, FsEvent, FsEventKind, WatchError, WatchMessage};
pub use engine::{RemoveOutcome, SyncEngine, SyncError, SyncOutcome};
pub use refresh::{Reauthenticator, RefreshController, RefreshError, RefreshPolicy};
pub use remote::{RemoteError, RemoteTransport};
pub use session::{Session, SessionError};
pub use settings::SyncSettings;
pub use store::{IdStore, StoreError};
