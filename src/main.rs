use std::path::PathBuf;

use clap::{Parser, Subcommand};
use time::Date;

use taskboard::{
    DocumentStore, MemoryDocumentStore, NewProject, Principal, ProjectId, SqliteDocumentStore,
    SyncCore, TaskId, logging, models::DUE_DATE_FORMAT,
};

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Track projects and their tasks in a document store")]
struct Cli {
    /// SQLite document store (an in-memory store is used when omitted)
    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Principal whose documents are used
    #[arg(long, value_name = "UID")]
    user: String,

    /// trace|debug|info|warn|error
    #[arg(long)]
    log_level: Option<String>,

    /// Write rotating log files here instead of stderr
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List projects
    Projects,
    /// Create a project
    AddProject {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Due date as YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        due: Date,
    },
    /// Delete a project and its tasks
    DeleteProject { project: String },
    /// List the tasks of a project
    Tasks { project: String },
    /// Add a task to a project
    AddTask { project: String, text: String },
    /// Delete a task from a project
    DeleteTask { project: String, task: String },
}

fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value, DUE_DATE_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(logging::default_log_level());
    logging::init_logging(level, args.log_dir.as_deref())?;

    let principal = Principal::new(args.user);
    match args.store {
        Some(path) => {
            let store = std::sync::Arc::new(SqliteDocumentStore::open(&path).await?);
            let result = run(SyncCore::with_store(store.clone()), principal, args.command).await;
            store.checkpoint().await?;
            store.close().await;
            result
        }
        None => run(SyncCore::new(MemoryDocumentStore::new()), principal, args.command).await,
    }
}

async fn run<S: DocumentStore>(
    core: SyncCore<S>,
    principal: Principal,
    command: Command,
) -> anyhow::Result<()> {
    core.load_projects(principal).await?;

    match command {
        Command::Projects => print_projects(&core)?,
        Command::AddProject {
            title,
            description,
            due,
        } => {
            core.start_add_project();
            let project = core
                .add_project(NewProject::new(title, description, due))
                .await?;
            println!("Created project {}", project.id);
        }
        Command::DeleteProject { project } => {
            let id = ProjectId::from(project);
            let target = core.projects().into_iter().find(|p| p.id == id);
            if target.is_none() {
                anyhow::bail!("No project with id {}", id);
            }
            core.delete_project(target.as_ref()).await?;
            println!("Deleted project {}", id);
        }
        Command::Tasks { project } => {
            core.select_project(ProjectId::from(project)).await?;
            print_tasks(&core);
        }
        Command::AddTask { project, text } => {
            core.select_project(ProjectId::from(project)).await?;
            let task = core.add_task(&text).await?;
            println!("Created task {}", task.id);
        }
        Command::DeleteTask { project, task } => {
            core.select_project(ProjectId::from(project)).await?;
            core.delete_task(TaskId::from(task)).await?;
            print_tasks(&core);
        }
    }
    Ok(())
}

fn print_projects<S: DocumentStore>(core: &SyncCore<S>) -> anyhow::Result<()> {
    let projects = core.projects();
    if projects.is_empty() {
        println!("No projects yet.");
        return Ok(());
    }
    for project in projects {
        println!(
            "{}  {}  (due {})  {}",
            project.id,
            project.title,
            project.due_date_string()?,
            project.description
        );
    }
    Ok(())
}

fn print_tasks<S: DocumentStore>(core: &SyncCore<S>) {
    let Some(project) = core.selected_project() else {
        println!("No project selected.");
        return;
    };
    println!("{} ({})", project.title, project.id);
    let tasks = core.tasks();
    if tasks.is_empty() {
        println!("  No tasks yet.");
    }
    for task in tasks {
        println!("  {}  {}", task.id, task.text);
    }
}
