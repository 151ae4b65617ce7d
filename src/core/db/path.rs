use std::fmt;

use crate::models::{Principal, ProjectId, TaskId};

const PRINCIPAL_ROOT: &str = "principal";
const PROJECTS: &str = "projects";
const TASKS: &str = "tasks";

/// Slash-separated address of a collection or a document.
///
/// Collections have an odd number of segments, documents an even number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    segments: Vec<String>,
}

impl DocPath {
    pub fn new<I, T>(segments: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            anyhow::bail!("document path must have at least one segment");
        }
        if let Some(bad) = segments
            .iter()
            .find(|s| s.trim().is_empty() || s.contains('/'))
        {
            anyhow::bail!("invalid document path segment {:?}", bad);
        }
        Ok(Self { segments })
    }

    /// `/principal/{uid}/projects`
    pub fn projects(principal: &Principal) -> anyhow::Result<Self> {
        Self::new([PRINCIPAL_ROOT, principal.uid.as_str(), PROJECTS])
    }

    /// `/principal/{uid}/projects/{pid}`
    pub fn project(principal: &Principal, project: &ProjectId) -> anyhow::Result<Self> {
        Self::projects(principal)?.child(project.as_str())
    }

    /// `/principal/{uid}/projects/{pid}/tasks`
    pub fn tasks(principal: &Principal, project: &ProjectId) -> anyhow::Result<Self> {
        Self::project(principal, project)?.child(TASKS)
    }

    /// `/principal/{uid}/projects/{pid}/tasks/{tid}`
    pub fn task(principal: &Principal, project: &ProjectId, task: &TaskId) -> anyhow::Result<Self> {
        Self::tasks(principal, project)?.child(task.as_str())
    }

    pub fn child(&self, segment: &str) -> anyhow::Result<Self> {
        Self::new(self.segments.iter().map(String::as_str).chain([segment]))
    }

    pub fn is_collection(&self) -> bool {
        self.segments.len() % 2 == 1
    }

    /// Splits a document path into its parent collection and document id.
    pub fn split_document(&self) -> anyhow::Result<(DocPath, &str)> {
        if self.is_collection() {
            anyhow::bail!("{} addresses a collection, not a document", self);
        }
        let Some((id, parent)) = self.segments.split_last() else {
            anyhow::bail!("document path is empty");
        };
        Ok((
            DocPath {
                segments: parent.to_vec(),
            },
            id.as_str(),
        ))
    }

    pub fn ensure_collection(&self) -> anyhow::Result<()> {
        if !self.is_collection() {
            anyhow::bail!("{} addresses a document, not a collection", self);
        }
        Ok(())
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
