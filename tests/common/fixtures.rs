use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use anyhow::Context;
use taskboard::{
    DocPath, Document, DocumentStore, Fields, MemoryDocumentStore, NewProject, NewTask, Principal,
    PrincipalDb, Project, ProjectRepository, SyncCore, SyncState, Task, TaskRepository,
};
use time::{OffsetDateTime, macros::date};
use tokio::sync::{oneshot, watch};

pub fn alice() -> Principal {
    Principal::new("alice")
}

pub fn bob() -> Principal {
    Principal::new("bob")
}

/// The "Website" draft used across scenarios.
pub fn website_draft() -> NewProject {
    NewProject::new("Website", "redo", date!(2024 - 01 - 01))
}

pub fn draft(title: &str) -> NewProject {
    NewProject::new(title, format!("{title} description"), date!(2024 - 06 - 30))
}

/// Writes a project straight into the store, bypassing the core.
pub async fn seed_project<S: DocumentStore>(
    store: &Arc<S>,
    principal: &Principal,
    title: &str,
) -> anyhow::Result<Project> {
    PrincipalDb::new(store.clone(), principal.clone())
        .add_project(&draft(title))
        .await
}

/// Writes a task straight into the store, `minutes` after a fixed origin.
pub async fn seed_task<S: DocumentStore>(
    store: &Arc<S>,
    principal: &Principal,
    project: &Project,
    text: &str,
    minutes: i64,
) -> anyhow::Result<Task> {
    let task = NewTask {
        text: text.to_string(),
        project_id: project.id.clone(),
        created_at: OffsetDateTime::UNIX_EPOCH + time::Duration::minutes(minutes),
    };
    PrincipalDb::new(store.clone(), principal.clone())
        .add_task(&task)
        .await
}

/// Resolves once `predicate` holds for the core state, or fails after a few seconds.
pub async fn wait_for<S: DocumentStore>(
    core: &SyncCore<S>,
    predicate: impl FnMut(&SyncState) -> bool,
) -> anyhow::Result<SyncState> {
    tokio::time::timeout(Duration::from_secs(5), until(core.subscribe(), predicate))
        .await
        .context("timed out waiting for sync state")?
}

async fn until(
    mut rx: watch::Receiver<SyncState>,
    mut predicate: impl FnMut(&SyncState) -> bool,
) -> anyhow::Result<SyncState> {
    loop {
        {
            let state = rx.borrow_and_update();
            if predicate(&state) {
                return Ok(state.clone());
            }
        }
        rx.changed().await?;
    }
}

/// Memory store whose list calls can be held until the test releases them.
///
/// A held listing reflects the store as it was when the call was made.
#[derive(Debug, Default)]
pub struct GatedStore {
    inner: MemoryDocumentStore,
    gates: Mutex<HashMap<String, VecDeque<oneshot::Receiver<()>>>>,
}

impl GatedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next list of `collection` waits until the returned sender fires.
    pub fn gate(&self, collection: &DocPath) -> oneshot::Sender<()> {
        let (release, wait) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push_back(wait);
        release
    }
}

impl DocumentStore for GatedStore {
    async fn list(&self, collection: &DocPath) -> anyhow::Result<Vec<Document>> {
        let gate = self
            .gates
            .lock()
            .unwrap()
            .get_mut(&collection.to_string())
            .and_then(VecDeque::pop_front);
        let snapshot = self.inner.list(collection).await;
        if let Some(gate) = gate {
            gate.await.context("gate dropped")?;
        }
        snapshot
    }

    async fn create(&self, collection: &DocPath, fields: Fields) -> anyhow::Result<String> {
        self.inner.create(collection, fields).await
    }

    async fn delete(&self, document: &DocPath) -> anyhow::Result<()> {
        self.inner.delete(document).await
    }
}

/// Memory store that fails chosen operations on demand.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryDocumentStore,
    fail_list: AtomicBool,
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
    deletes_before_failure: Mutex<Option<usize>>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Lets `count` more deletes through, then fails every one after.
    pub fn fail_delete_after(&self, count: usize) {
        *self.deletes_before_failure.lock().unwrap() = Some(count);
    }

    fn delete_budget_spent(&self) -> bool {
        match self.deletes_before_failure.lock().unwrap().as_mut() {
            Some(0) => true,
            Some(left) => {
                *left -= 1;
                false
            }
            None => false,
        }
    }
}

impl DocumentStore for FailingStore {
    async fn list(&self, collection: &DocPath) -> anyhow::Result<Vec<Document>> {
        if self.fail_list.load(Ordering::SeqCst) {
            anyhow::bail!("permission denied listing {}", collection);
        }
        self.inner.list(collection).await
    }

    async fn create(&self, collection: &DocPath, fields: Fields) -> anyhow::Result<String> {
        if self.fail_create.load(Ordering::SeqCst) {
            anyhow::bail!("network unreachable creating in {}", collection);
        }
        self.inner.create(collection, fields).await
    }

    async fn delete(&self, document: &DocPath) -> anyhow::Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) || self.delete_budget_spent() {
            anyhow::bail!("permission denied deleting {}", document);
        }
        self.inner.delete(document).await
    }
}
