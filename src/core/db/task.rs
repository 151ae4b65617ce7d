use std::future::Future;

use crate::models::{NewTask, ProjectId, Task, TaskId};

pub trait TaskRepository {
    fn get_tasks(&self, project: &ProjectId) -> impl Future<Output = anyhow::Result<Vec<Task>>> + Send;
    fn add_task(&self, task: &NewTask) -> impl Future<Output = anyhow::Result<Task>> + Send;
    fn delete_task(
        &self,
        project: &ProjectId,
        id: &TaskId,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}
