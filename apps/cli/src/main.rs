use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client_core::{ClientError, DurableSessionStore, TaskListClient};
use shared::domain::{PriorityFilter, StatusFilter, Task, TaskId, TaskPriority, TaskStatus};
use tracing::debug;

mod config;

#[derive(Parser, Debug)]
#[command(name = "tasks", about = "Command-line client for the to-do task service")]
struct Args {
    /// Override the task service base URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Override the local session database URL.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and persist the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Clear the persisted session.
    Logout,
    /// Show whether a session is stored.
    Status,
    /// Fetch the task collection and print it, optionally filtered.
    List {
        /// all, pending or completed
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        /// all, low, medium or high
        #[arg(long, default_value = "all")]
        priority: PriorityFilter,
    },
    /// Create a task (starts pending, medium priority).
    Add { text: String },
    /// Replace a task's text.
    Rename { id: String, text: String },
    /// Change a task's priority.
    Priority { id: String, priority: TaskPriority },
    /// Flip a task between pending and completed.
    Toggle { id: String },
    /// Delete a task.
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(database_url) = args.database_url {
        settings.database_url = database_url;
    }
    let database_url = config::normalize_database_url(&settings.database_url);
    debug!(server_url = %settings.server_url, %database_url, "resolved settings");

    let store = DurableSessionStore::initialize(&database_url).await?;
    let mut client = TaskListClient::new(settings.server_url, store.clone());
    client.restore_session().await?;

    if let Err(err) = run(args.command, &mut client, &store).await {
        if err
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::is_auth_failure)
        {
            eprintln!("No usable session; run `tasks login --email ... --password ...` first.");
        }
        return Err(err);
    }
    Ok(())
}

async fn run(
    command: Command,
    client: &mut TaskListClient,
    store: &DurableSessionStore,
) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            client.login(&email, &password).await?;
            println!("Logged in; session token stored.");
        }
        Command::Logout => {
            client.logout().await?;
            println!("Logged out; session cleared.");
        }
        Command::Status => match store.session_info().await? {
            Some(session) => println!("Logged in (session stored {}).", session.updated_at),
            None => println!("Not logged in."),
        },
        Command::List { status, priority } => {
            client.load_all().await?;
            let mut shown = 0usize;
            for task in client.filtered_view(status, priority) {
                println!("{}", render_task(task));
                shown += 1;
            }
            let total = client.tasks().len();
            if shown < total {
                println!("({shown} of {total} tasks shown)");
            }
        }
        Command::Add { text } => {
            let task = client.create(&text).await?;
            println!("Added {}", render_task(&task));
        }
        Command::Rename { id, text } => {
            let task = client.rename(&TaskId::new(id), &text).await?;
            println!("Renamed {}", render_task(&task));
        }
        Command::Priority { id, priority } => {
            let task = client.set_priority(&TaskId::new(id), priority).await?;
            println!("Updated {}", render_task(&task));
        }
        Command::Toggle { id } => {
            let id = TaskId::new(id);
            client.load_all().await?;
            let current = client
                .tasks()
                .iter()
                .find(|task| task.id == id)
                .map(|task| task.status)
                .ok_or_else(|| anyhow!("no task with id {id}"))?;
            let task = client.toggle_status(&id, current).await?;
            println!("Updated {}", render_task(&task));
        }
        Command::Remove { id } => {
            let id = TaskId::new(id);
            client.remove(&id).await?;
            println!("Removed task {id}.");
        }
    }

    Ok(())
}

fn render_task(task: &Task) -> String {
    let marker = match task.status {
        TaskStatus::Pending => ' ',
        TaskStatus::Completed => 'x',
    };
    format!(
        "[{marker}] {}  {}  ({}, {})",
        task.id,
        task.text,
        task.status.as_str(),
        task.priority.as_str()
    )
}
