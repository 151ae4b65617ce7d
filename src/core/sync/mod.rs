//! Selection and sync core.
//!
//! `SyncCore` is the only owner of [`SyncState`]. Each operation applies its
//! synchronous transition immediately and hands back a `'static` future that
//! performs the gateway call and folds the confirmed result into the state.
//! Dropping that future abandons the call; no state has been touched by it yet.
//!
//! Every completion is keyed to the principal, and for listings to the request,
//! that issued it. Completions whose context is gone are dropped instead of
//! overwriting newer state.

mod listing;
mod selection;
mod state;

use std::{future::Future, sync::Arc};

use tokio::{sync::watch, task::JoinHandle};

use crate::{
    core::{
        db::{DocumentStore, PrincipalDb, ProjectRepository, TaskRepository},
        identity::IdentityProvider,
    },
    error::{SyncError, SyncResult},
    models::{NewProject, NewTask, Principal, Project, ProjectId, Task, TaskId},
};

pub use selection::Selection;
pub use state::{Message, Staleness, SyncState, Transition};

pub struct SyncCore<S> {
    store: Arc<S>,
    state: Arc<watch::Sender<SyncState>>,
}

impl<S> Clone for SyncCore<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            state: self.state.clone(),
        }
    }
}

impl<S> std::fmt::Debug for SyncCore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCore")
            .field("state", &*self.state.borrow())
            .finish()
    }
}

fn dispatch(state: &watch::Sender<SyncState>, message: Message) -> Transition {
    dispatch_and_read(state, message, |_| ()).0
}

fn dispatch_and_read<R>(
    state: &watch::Sender<SyncState>,
    message: Message,
    read: impl FnOnce(&SyncState) -> R,
) -> (Transition, R) {
    let mut outcome = None;
    state.send_if_modified(|current| {
        let transition = current.apply(message);
        outcome = Some((transition, read(&*current)));
        transition.changed()
    });
    match outcome {
        Some(outcome) => outcome,
        None => unreachable!("send_if_modified always runs its closure"),
    }
}

fn gateway_failed(op: &'static str, source: anyhow::Error) -> SyncError {
    log::warn!(
        "event=gateway_failed module=sync op={} status=error error={:#}",
        op,
        source
    );
    SyncError::Gateway { op, source }
}

/// Replaces the tasks of `project` with a fresh listing if it is still viewed.
async fn resync_tasks<S: DocumentStore>(
    state: &watch::Sender<SyncState>,
    db: &PrincipalDb<S>,
    project: ProjectId,
) {
    let (transition, request) = dispatch_and_read(
        state,
        Message::TasksRequested(project.clone()),
        SyncState::task_request,
    );
    if let Transition::Discarded(_) = transition {
        return;
    }
    match db.get_tasks(&project).await {
        Ok(tasks) => {
            let transition = dispatch(
                state,
                Message::TasksLoaded {
                    principal: db.principal().clone(),
                    project,
                    request,
                    tasks,
                },
            );
            log_transition("resync_tasks", transition);
        }
        Err(err) => log::warn!(
            "event=gateway_failed module=sync op=resync_tasks status=error error={:#}",
            err
        ),
    }
}

fn log_transition(op: &'static str, transition: Transition) {
    match transition {
        Transition::Discarded(reason) => log::debug!(
            "event=completion_discarded module=sync op={} status=discarded reason={}",
            op,
            reason
        ),
        Transition::Applied | Transition::Unchanged => {
            log::debug!("event=completion_applied module=sync op={} status=ok", op)
        }
    }
}

impl<S: DocumentStore> SyncCore<S> {
    pub fn new(store: S) -> Self {
        Self::with_store(Arc::new(store))
    }

    pub fn with_store(store: Arc<S>) -> Self {
        let (state, _) = watch::channel(SyncState::default());
        Self {
            store,
            state: Arc::new(state),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Receiver that is notified after every applied transition.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.state.borrow().principal().cloned()
    }

    pub fn selection(&self) -> Selection {
        self.state.borrow().selection().clone()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.state.borrow().projects().to_vec()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks().to_vec()
    }

    pub fn selected_project(&self) -> Option<Project> {
        self.state.borrow().selected_project().cloned()
    }

    fn session(&self) -> SyncResult<PrincipalDb<S>> {
        let principal = self.principal().ok_or_else(|| {
            log::info!("event=precondition_failed module=sync status=skipped reason=no_principal");
            SyncError::NoPrincipal
        })?;
        Ok(PrincipalDb::new(self.store.clone(), principal))
    }

    fn viewing_session(&self) -> SyncResult<(PrincipalDb<S>, ProjectId)> {
        let db = self.session()?;
        let project = self.selection().viewed().cloned().ok_or_else(|| {
            log::info!("event=precondition_failed module=sync status=skipped reason=no_selection");
            SyncError::NoSelection
        })?;
        Ok((db, project))
    }

    /// Starts a session for `principal` (resetting state if another principal
    /// was signed in) and replaces the project list with the store's.
    pub fn load_projects(
        &self,
        principal: Principal,
    ) -> impl Future<Output = SyncResult<Transition>> + Send + use<S> {
        let (_, request) = dispatch_and_read(
            &self.state,
            Message::SessionStarted(principal.clone()),
            SyncState::project_request,
        );
        let db = PrincipalDb::new(self.store.clone(), principal);
        let state = self.state.clone();
        async move {
            let projects = db
                .get_projects()
                .await
                .map_err(|err| gateway_failed("load_projects", err))?;
            log::info!(
                "event=projects_loaded module=sync status=ok uid={} count={}",
                db.principal().uid,
                projects.len()
            );
            let transition = dispatch(
                &state,
                Message::ProjectsLoaded {
                    principal: db.principal().clone(),
                    request,
                    projects,
                },
            );
            log_transition("load_projects", transition);
            Ok(transition)
        }
    }

    /// Discards all state of the signed-in principal.
    pub fn sign_out(&self) {
        if dispatch(&self.state, Message::SessionEnded).changed() {
            log::info!("event=session_ended module=sync status=ok");
        }
    }

    /// Views `id` right away, then replaces `tasks` with its listing.
    ///
    /// The listing only lands if `id` is still the latest selection when it
    /// resolves.
    pub fn select_project(
        &self,
        id: ProjectId,
    ) -> impl Future<Output = SyncResult<Transition>> + Send + use<S> {
        let (_, request) = dispatch_and_read(
            &self.state,
            Message::ProjectSelected(id.clone()),
            SyncState::task_request,
        );
        let session = self.session();
        let state = self.state.clone();
        async move {
            let db = session?;
            let tasks = db
                .get_tasks(&id)
                .await
                .map_err(|err| gateway_failed("select_project", err))?;
            let transition = dispatch(
                &state,
                Message::TasksLoaded {
                    principal: db.principal().clone(),
                    project: id,
                    request,
                    tasks,
                },
            );
            log_transition("select_project", transition);
            Ok(transition)
        }
    }

    pub fn start_add_project(&self) {
        dispatch(&self.state, Message::DraftStarted);
    }

    pub fn cancel_add_project(&self) {
        dispatch(&self.state, Message::DraftCancelled);
    }

    /// Persists `draft`; on success appends it and returns to idle. On failure
    /// the draft stays open so it can be retried.
    pub fn add_project(
        &self,
        draft: NewProject,
    ) -> impl Future<Output = SyncResult<Project>> + Send + use<S> {
        let session = self.session();
        let state = self.state.clone();
        async move {
            let db = session?;
            let project = db
                .add_project(&draft)
                .await
                .map_err(|err| gateway_failed("add_project", err))?;
            log::info!(
                "event=project_added module=sync status=ok project_id={}",
                project.id
            );
            let transition = dispatch(
                &state,
                Message::ProjectAdded {
                    principal: db.principal().clone(),
                    project: project.clone(),
                },
            );
            log_transition("add_project", transition);
            Ok(project)
        }
    }

    /// Deletes `project` along with its tasks; on success drops it from
    /// `projects` and returns to idle.
    pub fn delete_project(
        &self,
        project: Option<&Project>,
    ) -> impl Future<Output = SyncResult<()>> + Send + use<S> {
        let target = match project {
            Some(project) if !project.id.is_empty() => Ok(project.id.clone()),
            _ => {
                log::info!(
                    "event=precondition_failed module=sync op=delete_project status=skipped reason=invalid_project"
                );
                Err(SyncError::InvalidTarget("project is missing or has no id"))
            }
        };
        let session = target.and_then(|id| Ok((self.session()?, id)));
        let state = self.state.clone();
        async move {
            let (db, id) = session?;
            if let Err(err) = db.delete_project(&id).await {
                // Some of the project's tasks may already be gone from the store.
                resync_tasks(&state, &db, id).await;
                return Err(gateway_failed("delete_project", err));
            }
            log::info!("event=project_deleted module=sync status=ok project_id={}", id);
            let transition = dispatch(
                &state,
                Message::ProjectDeleted {
                    principal: db.principal().clone(),
                    id,
                },
            );
            log_transition("delete_project", transition);
            Ok(())
        }
    }

    /// Creates a task in the viewed project. The task is only shown once the
    /// store has assigned its id.
    pub fn add_task(&self, text: &str) -> impl Future<Output = SyncResult<Task>> + Send + use<S> {
        let session = self
            .viewing_session()
            .map(|(db, project)| (db, NewTask::now(text, project)));
        let state = self.state.clone();
        async move {
            let (db, draft) = session?;
            let task = db
                .add_task(&draft)
                .await
                .map_err(|err| gateway_failed("add_task", err))?;
            let transition = dispatch(
                &state,
                Message::TaskAdded {
                    principal: db.principal().clone(),
                    task: task.clone(),
                },
            );
            log_transition("add_task", transition);
            Ok(task)
        }
    }

    pub fn delete_task(&self, id: TaskId) -> impl Future<Output = SyncResult<()>> + Send + use<S> {
        let session = self.viewing_session();
        let state = self.state.clone();
        async move {
            let (db, project) = session?;
            db.delete_task(&project, &id)
                .await
                .map_err(|err| gateway_failed("delete_task", err))?;
            let transition = dispatch(
                &state,
                Message::TaskDeleted {
                    principal: db.principal().clone(),
                    project,
                    id,
                },
            );
            log_transition("delete_task", transition);
            Ok(())
        }
    }

    /// Reacts to identity transitions until the provider goes away.
    ///
    /// A sign-in loads that principal's projects once; a sign-out discards the
    /// state. Re-announcing the current principal does nothing. Loads run as
    /// their own tasks so a slow store never delays the next transition.
    pub fn follow_identity(
        &self,
        mut identity: watch::Receiver<Option<Principal>>,
    ) -> impl Future<Output = ()> + Send + use<S> {
        let core = self.clone();
        async move {
            loop {
                let current = identity.borrow_and_update().clone();
                core.on_identity(current);
                if identity.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    pub fn spawn_identity_watch(&self, provider: &impl IdentityProvider) -> JoinHandle<()> {
        tokio::spawn(self.follow_identity(provider.subscribe()))
    }

    fn on_identity(&self, principal: Option<Principal>) {
        match principal {
            Some(principal) if self.principal().as_ref() == Some(&principal) => {}
            Some(principal) => {
                // Failures are logged by the operation itself.
                let load = self.load_projects(principal);
                tokio::spawn(async move {
                    let _ = load.await;
                });
            }
            None => self.sign_out(),
        }
    }
}
