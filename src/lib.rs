pub mod core;
pub mod error;
pub mod logging;
pub mod models;

pub use core::db::{
    DocPath, Document, DocumentStore, Fields, MemoryDocumentStore, PrincipalDb,
    ProjectRepository, SqliteDocumentStore, TaskRepository,
};
pub use core::identity::{IdentityProvider, Session};
pub use core::sync::{Message, Selection, Staleness, SyncCore, SyncState, Transition};
pub use error::{SyncError, SyncResult};
pub use models::{NewProject, NewTask, Principal, Project, ProjectId, Task, TaskId};
