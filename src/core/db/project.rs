use std::future::Future;

use crate::models::{NewProject, Project, ProjectId};

pub trait ProjectRepository {
    /// All projects of the bound principal, in store order.
    fn get_projects(&self) -> impl Future<Output = anyhow::Result<Vec<Project>>> + Send;
    fn add_project(&self, project: &NewProject) -> impl Future<Output = anyhow::Result<Project>> + Send;
    /// Deletes the project's tasks first, then the project document.
    fn delete_project(&self, id: &ProjectId) -> impl Future<Output = anyhow::Result<()>> + Send;
}
