mod memory;
mod path;
mod project;
mod state;
mod task;

use std::{future::Future, path::Path, sync::Arc};

use anyhow::Context;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use state::StoreState;
use uuid::Uuid;

use crate::models::{NewProject, NewTask, Principal, Project, ProjectId, Task, TaskId};

pub use memory::MemoryDocumentStore;
pub use path::DocPath;
pub use project::ProjectRepository;
pub use task::TaskRepository;

/// Field map of a stored document, without its id.
pub type Fields = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Path-addressed asynchronous document store.
///
/// Listing returns documents in store order. Deleting a document that does not
/// exist succeeds.
pub trait DocumentStore: Send + Sync + 'static {
    fn list(&self, collection: &DocPath) -> impl Future<Output = anyhow::Result<Vec<Document>>> + Send;
    /// Stores `fields` as a new document and returns the assigned id.
    fn create(
        &self,
        collection: &DocPath,
        fields: Fields,
    ) -> impl Future<Output = anyhow::Result<String>> + Send;
    fn delete(&self, document: &DocPath) -> impl Future<Output = anyhow::Result<()>> + Send;
}

#[derive(Debug)]
pub struct SqliteDocumentStore {
    state: Arc<StoreState>,
}

impl SqliteDocumentStore {
    pub async fn open<P: AsRef<Path>>(db_file: P) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(StoreState::open(db_file).await?),
        })
    }

    pub async fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(StoreState::open_in_memory().await?),
        })
    }

    /// Flush the write-ahead log into the database file.
    pub async fn checkpoint(&self) -> anyhow::Result<()> {
        self.state.checkpoint().await
    }

    pub async fn close(&self) {
        self.state.close().await
    }
}

impl DocumentStore for SqliteDocumentStore {
    async fn list(&self, collection: &DocPath) -> anyhow::Result<Vec<Document>> {
        collection.ensure_collection()?;
        let key = collection.to_string();
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, (String, String)>(
            r#"SELECT id, fields FROM documents WHERE collection = $1 ORDER BY seq ASC"#,
        )
        .bind(&key)
        .fetch_all(&mut **conn)
        .await
        .with_context(|| format!("Failed to list {}", key))?
        .into_iter()
        .map(|(id, fields)| -> anyhow::Result<Document> {
            let fields: Fields = serde_json::from_str(&fields)
                .with_context(|| format!("Corrupt document {}/{}", key, id))?;
            Ok(Document { id, fields })
        })
        .collect()
    }

    async fn create(&self, collection: &DocPath, fields: Fields) -> anyhow::Result<String> {
        collection.ensure_collection()?;
        let key = collection.to_string();
        let id = Uuid::new_v4().simple().to_string();
        let encoded = serde_json::to_string(&fields)?;
        let mut conn = self.state.conn().await?;
        sqlx::query(r#"INSERT INTO documents (collection, id, fields) VALUES ($1, $2, $3)"#)
            .bind(&key)
            .bind(&id)
            .bind(&encoded)
            .execute(&mut **conn)
            .await
            .with_context(|| format!("Failed to create document in {}", key))?;
        Ok(id)
    }

    async fn delete(&self, document: &DocPath) -> anyhow::Result<()> {
        let (collection, id) = document.split_document()?;
        let key = collection.to_string();
        let mut conn = self.state.conn().await?;
        sqlx::query(r#"DELETE FROM documents WHERE collection = $1 AND id = $2"#)
            .bind(&key)
            .bind(id)
            .execute(&mut **conn)
            .await
            .with_context(|| format!("Failed to delete {}", document))?;
        Ok(())
    }
}

/// Typed view of a document store bound to one principal's namespace.
#[derive(Debug)]
pub struct PrincipalDb<S> {
    store: Arc<S>,
    principal: Principal,
}

impl<S> Clone for PrincipalDb<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            principal: self.principal.clone(),
        }
    }
}

impl<S: DocumentStore> PrincipalDb<S> {
    pub fn new(store: Arc<S>, principal: Principal) -> Self {
        Self { store, principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

fn encode<T: Serialize>(value: &T) -> anyhow::Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => anyhow::bail!("Expected document fields to be an object, got {}", other),
    }
}

fn decode<T: DeserializeOwned>(collection: &DocPath, document: Document) -> anyhow::Result<(String, T)> {
    let value = serde_json::from_value(Value::Object(document.fields))
        .with_context(|| format!("Malformed document {}/{}", collection, document.id))?;
    Ok((document.id, value))
}

impl<S: DocumentStore> ProjectRepository for PrincipalDb<S> {
    async fn get_projects(&self) -> anyhow::Result<Vec<Project>> {
        let collection = DocPath::projects(&self.principal)?;
        self.store
            .list(&collection)
            .await?
            .into_iter()
            .map(|document| -> anyhow::Result<Project> {
                let (id, fields) = decode::<NewProject>(&collection, document)?;
                Ok(fields.into_project(ProjectId::new(id)))
            })
            .collect()
    }

    async fn add_project(&self, project: &NewProject) -> anyhow::Result<Project> {
        let collection = DocPath::projects(&self.principal)?;
        let id = self.store.create(&collection, encode(project)?).await?;
        Ok(project.clone().into_project(ProjectId::new(id)))
    }

    async fn delete_project(&self, id: &ProjectId) -> anyhow::Result<()> {
        let tasks = DocPath::tasks(&self.principal, id)?;
        for document in self.store.list(&tasks).await? {
            self.store.delete(&tasks.child(&document.id)?).await?;
        }
        self.store
            .delete(&DocPath::project(&self.principal, id)?)
            .await
    }
}

impl<S: DocumentStore> TaskRepository for PrincipalDb<S> {
    /// Tasks of `project`, most recent first.
    async fn get_tasks(&self, project: &ProjectId) -> anyhow::Result<Vec<Task>> {
        let collection = DocPath::tasks(&self.principal, project)?;
        let mut tasks = self
            .store
            .list(&collection)
            .await?
            .into_iter()
            .map(|document| -> anyhow::Result<Task> {
                let (id, fields) = decode::<NewTask>(&collection, document)?;
                Ok(fields.into_task(TaskId::new(id)))
            })
            .collect::<anyhow::Result<Vec<Task>>>()?;
        // Later store order wins ties.
        tasks.reverse();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn add_task(&self, task: &NewTask) -> anyhow::Result<Task> {
        let collection = DocPath::tasks(&self.principal, &task.project_id)?;
        let id = self.store.create(&collection, encode(task)?).await?;
        Ok(task.clone().into_task(TaskId::new(id)))
    }

    async fn delete_task(&self, project: &ProjectId, id: &TaskId) -> anyhow::Result<()> {
        self.store
            .delete(&DocPath::task(&self.principal, project, id)?)
            .await
    }
}
