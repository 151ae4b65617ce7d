use crate::models::ProjectId;

/// Which view the user is in.
///
/// ```text
/// Idle --start_add_project--> Draft
/// Draft --cancel_add_project / add_project ok--> Idle
/// any --select_project(id)--> Viewing(id)
/// Viewing(id) --delete_project ok--> Idle
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Selection {
    /// Nothing selected.
    #[default]
    Idle,
    /// Composing a new project.
    Draft,
    Viewing(ProjectId),
}

impl Selection {
    pub fn viewed(&self) -> Option<&ProjectId> {
        match self {
            Selection::Viewing(id) => Some(id),
            Selection::Idle | Selection::Draft => None,
        }
    }

    pub fn is_viewing(&self, id: &ProjectId) -> bool {
        self.viewed() == Some(id)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Selection::Idle)
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Selection::Draft)
    }
}
