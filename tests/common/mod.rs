#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from taskboard for tests
pub use taskboard::{
    DocPath, DocumentStore, MemoryDocumentStore, NewProject, Principal, PrincipalDb, Project,
    ProjectId, ProjectRepository, Selection, Session, SqliteDocumentStore, Staleness, SyncCore,
    SyncError, SyncState, Task, TaskId, TaskRepository, Transition,
};
