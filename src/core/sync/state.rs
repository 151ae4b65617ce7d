use crate::models::{Principal, Project, ProjectId, Task, TaskId};

use super::{
    Selection,
    listing::{Insert, Listing},
};

/// The single record presentation renders from.
///
/// `tasks` only ever holds tasks of the viewed project, most recent first.
/// Selection moves optimistically; task additions and removals only land once
/// the store has confirmed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    principal: Option<Principal>,
    selection: Selection,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    project_listing: Listing<Project>,
    task_listing: Listing<Task>,
}

/// Every state change goes through one of these.
#[derive(Debug, Clone)]
pub enum Message {
    /// Starts or continues a session and issues a project listing.
    SessionStarted(Principal),
    SessionEnded,
    ProjectsLoaded {
        principal: Principal,
        /// Generation handed out by the `SessionStarted` that issued the listing.
        request: u64,
        projects: Vec<Project>,
    },
    ProjectSelected(ProjectId),
    /// Re-lists the tasks of a project that is still viewed.
    TasksRequested(ProjectId),
    TasksLoaded {
        principal: Principal,
        project: ProjectId,
        /// Generation handed out by the `ProjectSelected` that issued the listing.
        request: u64,
        tasks: Vec<Task>,
    },
    DraftStarted,
    DraftCancelled,
    ProjectAdded {
        principal: Principal,
        project: Project,
    },
    ProjectDeleted {
        principal: Principal,
        id: ProjectId,
    },
    TaskAdded {
        principal: Principal,
        task: Task,
    },
    TaskDeleted {
        principal: Principal,
        project: ProjectId,
        id: TaskId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Unchanged,
    /// A completion arrived for a context that no longer exists.
    Discarded(Staleness),
}

impl Transition {
    pub fn changed(self) -> bool {
        matches!(self, Transition::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    SignedOut,
    PrincipalChanged,
    SelectionChanged,
    /// A newer listing of the same collection was requested.
    Superseded,
}

impl std::fmt::Display for Staleness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Staleness::SignedOut => "signed_out",
            Staleness::PrincipalChanged => "principal_changed",
            Staleness::SelectionChanged => "selection_changed",
            Staleness::Superseded => "superseded",
        })
    }
}

impl SyncState {
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The project behind `Selection::Viewing`, if it is loaded.
    pub fn selected_project(&self) -> Option<&Project> {
        let id = self.selection.viewed()?;
        self.projects.iter().find(|project| &project.id == id)
    }

    pub(crate) fn project_request(&self) -> u64 {
        self.project_listing.request()
    }

    pub(crate) fn task_request(&self) -> u64 {
        self.task_listing.request()
    }

    pub fn apply(&mut self, message: Message) -> Transition {
        match message {
            Message::SessionStarted(principal) => {
                let transition = if self.principal.as_ref() == Some(&principal) {
                    Transition::Unchanged
                } else {
                    self.reset(Some(principal));
                    Transition::Applied
                };
                self.project_listing.issue();
                transition
            }
            Message::SessionEnded => {
                if self.principal.is_none() && self.is_empty() {
                    return Transition::Unchanged;
                }
                self.reset(None);
                Transition::Applied
            }
            Message::ProjectsLoaded {
                principal,
                request,
                projects,
            } => {
                if let Some(stale) = self.stale_for(&principal) {
                    return Transition::Discarded(stale);
                }
                if !self.project_listing.is_current(request) {
                    return Transition::Discarded(Staleness::Superseded);
                }
                self.projects = self.project_listing.land(projects, Insert::Back);
                Transition::Applied
            }
            Message::ProjectSelected(id) => {
                self.task_listing.issue();
                self.set_selection(Selection::Viewing(id));
                Transition::Applied
            }
            Message::TasksRequested(id) => {
                if !self.selection.is_viewing(&id) {
                    return Transition::Discarded(Staleness::SelectionChanged);
                }
                self.task_listing.issue();
                Transition::Unchanged
            }
            Message::TasksLoaded {
                principal,
                project,
                request,
                mut tasks,
            } => {
                if let Some(stale) = self.stale_for(&principal) {
                    return Transition::Discarded(stale);
                }
                if !self.selection.is_viewing(&project) {
                    return Transition::Discarded(Staleness::SelectionChanged);
                }
                if !self.task_listing.is_current(request) {
                    return Transition::Discarded(Staleness::Superseded);
                }
                tasks.retain(|task| task.project_id == project);
                self.tasks = self.task_listing.land(tasks, Insert::Front);
                Transition::Applied
            }
            Message::DraftStarted => self.set_selection(Selection::Draft),
            Message::DraftCancelled => self.set_selection(Selection::Idle),
            Message::ProjectAdded { principal, project } => {
                if let Some(stale) = self.stale_for(&principal) {
                    return Transition::Discarded(stale);
                }
                self.project_listing.confirm_added(&project);
                self.projects.push(project);
                self.set_selection(Selection::Idle);
                Transition::Applied
            }
            Message::ProjectDeleted { principal, id } => {
                if let Some(stale) = self.stale_for(&principal) {
                    return Transition::Discarded(stale);
                }
                self.project_listing.confirm_deleted(&id);
                let before = self.projects.len();
                self.projects.retain(|project| project.id != id);
                let removed = self.projects.len() != before;
                let moved = self.set_selection(Selection::Idle).changed();
                if removed || moved {
                    Transition::Applied
                } else {
                    Transition::Unchanged
                }
            }
            Message::TaskAdded { principal, task } => {
                if let Some(stale) = self.stale_for(&principal) {
                    return Transition::Discarded(stale);
                }
                if !self.selection.is_viewing(&task.project_id) {
                    return Transition::Discarded(Staleness::SelectionChanged);
                }
                self.task_listing.confirm_added(&task);
                self.tasks.insert(0, task);
                Transition::Applied
            }
            Message::TaskDeleted {
                principal,
                project,
                id,
            } => {
                if let Some(stale) = self.stale_for(&principal) {
                    return Transition::Discarded(stale);
                }
                if !self.selection.is_viewing(&project) {
                    return Transition::Discarded(Staleness::SelectionChanged);
                }
                self.task_listing.confirm_deleted(&id);
                let before = self.tasks.len();
                self.tasks.retain(|task| task.id != id);
                if self.tasks.len() != before {
                    Transition::Applied
                } else {
                    Transition::Unchanged
                }
            }
        }
    }

    fn stale_for(&self, principal: &Principal) -> Option<Staleness> {
        match &self.principal {
            None => Some(Staleness::SignedOut),
            Some(current) if current != principal => Some(Staleness::PrincipalChanged),
            Some(_) => None,
        }
    }

    /// Tasks never survive a change of selection.
    fn set_selection(&mut self, next: Selection) -> Transition {
        if self.selection == next {
            return Transition::Unchanged;
        }
        self.selection = next;
        self.tasks.clear();
        Transition::Applied
    }

    fn is_empty(&self) -> bool {
        self.selection.is_idle() && self.projects.is_empty() && self.tasks.is_empty()
    }

    fn reset(&mut self, principal: Option<Principal>) {
        // Generations keep counting so nothing issued before the reset can match.
        let mut project_listing = std::mem::take(&mut self.project_listing);
        let mut task_listing = std::mem::take(&mut self.task_listing);
        project_listing.abandon();
        task_listing.abandon();
        *self = SyncState {
            principal,
            project_listing,
            task_listing,
            ..SyncState::default()
        };
    }
}
