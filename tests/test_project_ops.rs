//! Integration tests for project operations of the sync core.
//!
//! Tests cover:
//! - Loading projects on sign-in (empty and populated)
//! - Draft mode transitions
//! - Adding and deleting projects, including failure paths
//! - Cascading task deletion, including a cascade that fails partway

mod common;

use std::{collections::BTreeSet, sync::Arc};

use common::*;
use time::macros::date;

fn ids(projects: &[Project]) -> BTreeSet<ProjectId> {
    projects.iter().map(|p| p.id.clone()).collect()
}

#[tokio::test]
async fn test_sign_in_with_no_projects() -> anyhow::Result<()> {
    let core = SyncCore::new(MemoryDocumentStore::new());

    let transition = core.load_projects(alice()).await?;

    assert_eq!(transition, Transition::Applied);
    assert!(core.projects().is_empty());
    assert_eq!(core.selection(), Selection::Idle);
    assert!(core.selected_project().is_none());
    Ok(())
}

#[tokio::test]
async fn test_load_preserves_store_order() -> anyhow::Result<()> {
    let store = Arc::new(MemoryDocumentStore::new());
    let first = seed_project(&store, &alice(), "First").await?;
    let second = seed_project(&store, &alice(), "Second").await?;
    seed_project(&store, &bob(), "Not mine").await?;

    let core = SyncCore::with_store(store);
    core.load_projects(alice()).await?;

    let loaded: Vec<ProjectId> = core.projects().into_iter().map(|p| p.id).collect();
    assert_eq!(loaded, vec![first.id, second.id]);
    Ok(())
}

#[tokio::test]
async fn test_add_project_from_draft() -> anyhow::Result<()> {
    // 1. Sign in and open a draft
    let core = SyncCore::new(MemoryDocumentStore::new());
    core.load_projects(alice()).await?;
    core.start_add_project();
    assert_eq!(core.selection(), Selection::Draft);

    // 2. Submit the draft
    let project = core.add_project(website_draft()).await?;

    // 3. Verify the stored project and the return to idle
    assert!(!project.id.is_empty(), "Project should have a store-assigned id");
    assert_eq!(project.title, "Website");
    assert_eq!(project.description, "redo");
    assert_eq!(project.due_date, date!(2024 - 01 - 01));
    assert_eq!(core.projects(), vec![project]);
    assert_eq!(core.selection(), Selection::Idle);
    Ok(())
}

#[tokio::test]
async fn test_extra_project_fields_round_trip_through_the_store() -> anyhow::Result<()> {
    let store = Arc::new(MemoryDocumentStore::new());
    let core = SyncCore::with_store(store.clone());
    core.load_projects(alice()).await?;
    core.add_project(website_draft().with_field("color", "teal"))
        .await?;

    let fresh = SyncCore::with_store(store);
    fresh.load_projects(alice()).await?;
    let projects = fresh.projects();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].extra.get("color"), Some(&serde_json::json!("teal")));
    Ok(())
}

#[tokio::test]
async fn test_draft_transitions_ignore_prior_state() -> anyhow::Result<()> {
    let store = Arc::new(MemoryDocumentStore::new());
    let project = seed_project(&store, &alice(), "Garden").await?;
    let core = SyncCore::with_store(store);
    core.load_projects(alice()).await?;

    core.cancel_add_project();
    assert_eq!(core.selection(), Selection::Idle);
    core.start_add_project();
    core.start_add_project();
    assert_eq!(core.selection(), Selection::Draft);

    core.select_project(project.id.clone()).await?;
    core.start_add_project();
    assert_eq!(core.selection(), Selection::Draft);
    assert!(core.tasks().is_empty());

    core.select_project(project.id).await?;
    core.cancel_add_project();
    assert_eq!(core.selection(), Selection::Idle);
    Ok(())
}

#[tokio::test]
async fn test_add_then_delete_restores_projects() -> anyhow::Result<()> {
    let store = Arc::new(MemoryDocumentStore::new());
    seed_project(&store, &alice(), "Existing").await?;
    let core = SyncCore::with_store(store);
    core.load_projects(alice()).await?;
    let before = ids(&core.projects());

    // 1. Add a project
    core.start_add_project();
    let added = core.add_project(draft("Temporary")).await?;
    assert_eq!(core.projects().len(), 2);

    // 2. Delete it again
    core.delete_project(Some(&added)).await?;

    // 3. Verify the project set is back to where it started
    assert_eq!(ids(&core.projects()), before);
    assert_eq!(core.selection(), Selection::Idle);
    Ok(())
}

#[tokio::test]
async fn test_delete_selected_project_returns_to_idle() -> anyhow::Result<()> {
    let store = Arc::new(MemoryDocumentStore::new());
    let keep = seed_project(&store, &alice(), "Keep").await?;
    let doomed = seed_project(&store, &alice(), "Doomed").await?;
    let core = SyncCore::with_store(store);
    core.load_projects(alice()).await?;

    core.select_project(doomed.id.clone()).await?;
    let selected = core.selected_project();
    assert_eq!(selected.as_ref().map(|p| &p.id), Some(&doomed.id));

    core.delete_project(selected.as_ref()).await?;

    assert_eq!(core.projects(), vec![keep]);
    assert_eq!(core.selection(), Selection::Idle);
    assert!(core.tasks().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_delete_already_removed_project_is_harmless() -> anyhow::Result<()> {
    let store = Arc::new(MemoryDocumentStore::new());
    let project = seed_project(&store, &alice(), "Once").await?;
    let core = SyncCore::with_store(store);
    core.load_projects(alice()).await?;

    core.delete_project(Some(&project)).await?;
    let after_first = core.projects();

    // Second delete of the same id must neither fail nor touch the list.
    core.delete_project(Some(&project)).await?;
    assert_eq!(core.projects(), after_first);
    assert!(after_first.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_delete_without_valid_target_is_rejected() -> anyhow::Result<()> {
    let store = Arc::new(MemoryDocumentStore::new());
    let project = seed_project(&store, &alice(), "Safe").await?;
    let core = SyncCore::with_store(store);
    core.load_projects(alice()).await?;

    let missing = core.delete_project(None).await;
    assert!(matches!(missing, Err(SyncError::InvalidTarget(_))));

    let mut blank = project.clone();
    blank.id = ProjectId::from("");
    let blank_id = core.delete_project(Some(&blank)).await;
    assert!(matches!(blank_id, Err(SyncError::InvalidTarget(_))));

    assert_eq!(core.projects(), vec![project]);
    Ok(())
}

#[tokio::test]
async fn test_operations_without_principal_are_rejected() -> anyhow::Result<()> {
    let core = SyncCore::new(MemoryDocumentStore::new());

    let added = core.add_project(website_draft()).await;
    assert!(matches!(added, Err(SyncError::NoPrincipal)));

    let stray = Project {
        id: ProjectId::from("p1"),
        title: "Stray".to_string(),
        description: String::new(),
        due_date: date!(2024 - 01 - 01),
        extra: Default::default(),
    };
    let deleted = core.delete_project(Some(&stray)).await;
    assert!(matches!(deleted, Err(SyncError::NoPrincipal)));
    assert!(deleted.unwrap_err().is_precondition());
    Ok(())
}

#[tokio::test]
async fn test_failed_add_keeps_draft_open() -> anyhow::Result<()> {
    let store = Arc::new(FailingStore::new());
    let core = SyncCore::with_store(store.clone());
    core.load_projects(alice()).await?;
    core.start_add_project();

    // 1. Submit while the store rejects writes
    store.fail_create(true);
    let result = core.add_project(website_draft()).await;
    assert!(matches!(
        result,
        Err(SyncError::Gateway {
            op: "add_project",
            ..
        })
    ));
    assert!(core.projects().is_empty());
    assert_eq!(core.selection(), Selection::Draft);

    // 2. Retry once the store recovers
    store.fail_create(false);
    core.add_project(website_draft()).await?;
    assert_eq!(core.projects().len(), 1);
    assert_eq!(core.selection(), Selection::Idle);
    Ok(())
}

#[tokio::test]
async fn test_failed_load_keeps_previous_projects() -> anyhow::Result<()> {
    let store = Arc::new(FailingStore::new());
    seed_project(&store, &alice(), "Loaded").await?;
    let core = SyncCore::with_store(store.clone());
    core.load_projects(alice()).await?;
    assert_eq!(core.projects().len(), 1);

    seed_project(&store, &alice(), "Unseen").await?;
    store.fail_list(true);
    let result = core.load_projects(alice()).await;

    assert!(matches!(result, Err(SyncError::Gateway { .. })));
    assert_eq!(core.projects().len(), 1);
    assert_eq!(core.projects()[0].title, "Loaded");
    Ok(())
}

#[tokio::test]
async fn test_failed_delete_changes_nothing() -> anyhow::Result<()> {
    let store = Arc::new(FailingStore::new());
    let project = seed_project(&store, &alice(), "Sticky").await?;
    let core = SyncCore::with_store(store.clone());
    core.load_projects(alice()).await?;
    core.select_project(project.id.clone()).await?;

    store.fail_delete(true);
    let result = core.delete_project(Some(&project)).await;

    assert!(result.is_err());
    assert_eq!(core.projects(), vec![project.clone()]);
    assert_eq!(core.selection(), Selection::Viewing(project.id));
    Ok(())
}

#[tokio::test]
async fn test_delete_project_removes_its_tasks() -> anyhow::Result<()> {
    let store = Arc::new(MemoryDocumentStore::new());
    let project = seed_project(&store, &alice(), "Chores").await?;
    seed_task(&store, &alice(), &project, "sweep", 1).await?;
    seed_task(&store, &alice(), &project, "mop", 2).await?;
    let core = SyncCore::with_store(store.clone());
    core.load_projects(alice()).await?;

    // 1. Delete the project
    core.delete_project(Some(&project)).await?;

    // 2. Verify neither the project nor its tasks remain in the store
    let tasks = DocPath::tasks(&alice(), &project.id)?;
    assert_eq!(store.len(&tasks).await, 0);
    assert_eq!(store.len(&DocPath::projects(&alice())?).await, 0);
    Ok(())
}

#[tokio::test]
async fn test_failed_cascade_relists_tasks_of_viewed_project() -> anyhow::Result<()> {
    // 1. View a project with two tasks
    let store = Arc::new(FailingStore::new());
    let project = seed_project(&store, &alice(), "Chores").await?;
    seed_task(&store, &alice(), &project, "sweep", 1).await?;
    seed_task(&store, &alice(), &project, "mop", 2).await?;
    let core = SyncCore::with_store(store.clone());
    core.load_projects(alice()).await?;
    core.select_project(project.id.clone()).await?;
    assert_eq!(core.tasks().len(), 2);

    // 2. Let the cascade delete one task, then fail
    store.fail_delete_after(1);
    let result = core.delete_project(Some(&project)).await;
    assert!(matches!(
        result,
        Err(SyncError::Gateway {
            op: "delete_project",
            ..
        })
    ));

    // 3. Verify the project stays and only the surviving task is shown
    assert_eq!(core.projects(), vec![project.clone()]);
    assert_eq!(core.selection(), Selection::Viewing(project.id));
    let texts: Vec<String> = core.tasks().into_iter().map(|t| t.text).collect();
    assert_eq!(texts, vec!["mop"]);
    Ok(())
}
