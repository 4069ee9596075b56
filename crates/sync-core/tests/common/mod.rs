#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use sync_core::remote::Result as RemoteResult;
use sync_core::{
    IdStore, Reauthenticator, RefreshController, RefreshError, RefreshPolicy, RemoteError,
    RemoteTransport, Session, SyncEngine,
};
use tempfile::TempDir;

pub const SPACE: &str = "space-1";

/// A call as seen by the mock service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open(String),
    Create { title: String, content: String },
    Update { id: String, title: String },
    Delete(Vec<String>),
    Health,
}

#[derive(Default)]
struct ServiceState {
    objects: HashMap<String, (String, String)>,
    calls: Vec<Call>,
    failures: VecDeque<RemoteError>,
    accepted_token: Option<String>,
    next_id: usize,
}

/// In-memory object service that records every call.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<ServiceState>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Only `token` is accepted from now on; anything else is Unauthenticated.
    pub fn accept_only(&self, token: &str) {
        self.state.lock().unwrap().accepted_token = Some(token.to_string());
    }

    /// Fail the next call with `err`.
    pub fn fail_next(&self, err: RemoteError) {
        self.state.lock().unwrap().failures.push_back(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn creates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create { .. }))
            .count()
    }

    pub fn object(&self, id: &str) -> Option<(String, String)> {
        self.state.lock().unwrap().objects.get(id).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    /// Drop an object behind the engine's back.
    pub fn forget_object(&self, id: &str) {
        self.state.lock().unwrap().objects.remove(id);
    }

    fn begin(&self, token: &str, call: Call) -> Result<std::sync::MutexGuard<'_, ServiceState>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }
        if state.accepted_token.as_deref().is_some_and(|t| t != token) {
            return Err(RemoteError::Unauthenticated);
        }
        Ok(state)
    }
}

#[async_trait]
impl RemoteTransport for MockTransport {
    async fn open_container(&self, token: &str, container_id: &str) -> RemoteResult<()> {
        let _state = self.begin(token, Call::Open(container_id.to_string()))?;
        Ok(())
    }

    async fn create_object(
        &self,
        token: &str,
        title: &str,
        content: &str,
        _container_id: &str,
    ) -> RemoteResult<String> {
        let mut state = self.begin(
            token,
            Call::Create {
                title: title.to_string(),
                content: content.to_string(),
            },
        )?;
        state.next_id += 1;
        let id = format!("obj-{}", state.next_id);
        state
            .objects
            .insert(id.clone(), (title.to_string(), content.to_string()));
        Ok(id)
    }

    async fn update_object(
        &self,
        token: &str,
        object_id: &str,
        title: &str,
        content: &str,
        _container_id: &str,
    ) -> RemoteResult<()> {
        let mut state = self.begin(
            token,
            Call::Update {
                id: object_id.to_string(),
                title: title.to_string(),
            },
        )?;
        match state.objects.get_mut(object_id) {
            Some(object) => {
                *object = (title.to_string(), content.to_string());
                Ok(())
            }
            None => Err(RemoteError::NotFound),
        }
    }

    async fn delete_objects(
        &self,
        token: &str,
        object_ids: &[String],
        _container_id: &str,
    ) -> RemoteResult<()> {
        let mut state = self.begin(token, Call::Delete(object_ids.to_vec()))?;
        for id in object_ids {
            if state.objects.remove(id).is_none() {
                return Err(RemoteError::NotFound);
            }
        }
        Ok(())
    }

    async fn health_check(&self, token: &str) -> RemoteResult<()> {
        let _state = self.begin(token, Call::Health)?;
        Ok(())
    }
}

/// Re-authenticator that hands out `fresh-N` tokens and counts calls.
#[derive(Default)]
pub struct MockReauth {
    calls: AtomicUsize,
}

impl MockReauth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reauthenticator for MockReauth {
    async fn reauthenticate(&self) -> Result<String, RefreshError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("fresh-{n}"))
    }
}

/// Everything a test needs around one engine.
pub struct Harness {
    pub dir: TempDir,
    pub transport: Arc<MockTransport>,
    pub reauth: Arc<MockReauth>,
    pub engine: Arc<SyncEngine>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("workspace")).unwrap();

        let transport = MockTransport::new();
        let reauth = MockReauth::new();
        let refresh = RefreshController::new("initial", reauth.clone(), RefreshPolicy::default());
        let session = Arc::new(Session::connected(transport.clone(), refresh));
        let store = Arc::new(IdStore::open(dir.path().join("objectmap.json")).unwrap());
        let engine = Arc::new(SyncEngine::new(session, store, SPACE));

        Self {
            dir,
            transport,
            reauth,
            engine,
        }
    }

    pub fn root(&self) -> std::path::PathBuf {
        self.dir.path().join("workspace")
    }

    pub fn write(&self, name: &str, content: &str) -> std::path::PathBuf {
        let path = self.root().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn delete(&self, path: &Path) {
        std::fs::remove_file(path).unwrap();
    }

    pub fn store(&self) -> &IdStore {
        self.engine.store()
    }

    /// Reopen the mapping file from disk.
    pub fn reload_store(&self) -> IdStore {
        IdStore::open(self.dir.path().join("objectmap.json")).unwrap()
    }
}
