mod config;
mod error;
mod keys;
mod store;
mod tui;

use anyhow::{Context, Result, bail};
use clap::Parser;

use config::Config;
use store::{Store, Task};

#[derive(Parser)]
#[command(
    name = "tudu",
    about = "A simple terminal todo list with story points",
    after_help = "Run without arguments to launch the interactive TUI."
)]
struct Cli {
    /// Project name (used with --add-task or --list)
    #[arg(short, long)]
    project: Option<String>,

    /// Add a new task with the given title
    #[arg(short = 'a', long = "add-task", value_name = "TITLE")]
    add_task: Option<String>,

    /// Story points for the task
    #[arg(short = 's', long = "story-points", value_name = "POINTS")]
    story_points: Option<i64>,

    /// Task description
    #[arg(short = 'd', long)]
    description: Option<String>,

    /// List tasks (use --project to filter)
    #[arg(short = 'l', long)]
    list: bool,

    /// List all projects
    #[arg(long)]
    projects: bool,

    /// Toggle completion of a task (search by title)
    #[arg(short = 'c', long, value_name = "TITLE")]
    complete: Option<String>,

    /// Delete a task (search by title)
    #[arg(long = "delete-task", value_name = "TITLE")]
    delete_task: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load()?;
    config.ensure_dirs()?;
    let store = Store::open(&config)?;
    store.migrate()?;

    if let Some(ref title) = cli.add_task {
        let project = cli
            .project
            .as_deref()
            .context("--project is required when adding a task")?;
        let points = cli.story_points.unwrap_or(config.default_story_points);
        cmd_add_task(&store, project, title, points, cli.description.as_deref())
    } else if cli.list {
        cmd_list_tasks(&store, cli.project.as_deref())
    } else if cli.projects {
        cmd_list_projects(&store)
    } else if let Some(ref query) = cli.complete {
        cmd_complete_task(&store, query)
    } else if let Some(ref query) = cli.delete_task {
        cmd_delete_task(&store, query)
    } else {
        tui::run(store, &config)
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    // Honor RUST_LOG if set, otherwise use the verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            _ => EnvFilter::new("debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn cmd_add_task(
    store: &Store,
    project_name: &str,
    title: &str,
    story_points: i64,
    description: Option<&str>,
) -> Result<()> {
    let project = store.get_or_create_project(project_name)?;
    let task = store.create_task(
        &project.id,
        title,
        story_points,
        description.unwrap_or(""),
    )?;
    println!("Task added to project '{}':", project.name);
    println!(
        "  {} | SP:{} | {}",
        task.priority().display(),
        task.story_points,
        task.title
    );
    Ok(())
}

fn cmd_list_tasks(store: &Store, project_name: Option<&str>) -> Result<()> {
    let tasks = match project_name {
        Some(name) => {
            let project = store.find_project(name)?;
            println!("\n  Project: {}", project.name);
            store.list_tasks_for_project(&project.id)?
        }
        None => {
            println!("\n  All Tasks");
            store.list_tasks()?
        }
    };
    println!("  {}", "─".repeat(50));

    if tasks.is_empty() {
        println!("  No tasks found.");
        return Ok(());
    }

    for task in &tasks {
        println!(
            "  {} SP:{:<3} {}",
            task.status.icon(),
            task.story_points,
            task.title
        );
    }

    let total_points: i64 = tasks.iter().map(|t| t.story_points).sum();
    let done_points: i64 = tasks
        .iter()
        .filter(|t| t.is_complete())
        .map(|t| t.story_points)
        .sum();
    println!("  {}", "─".repeat(50));
    println!(
        "  {} tasks | {done_points}/{total_points} story points done\n",
        tasks.len()
    );
    Ok(())
}

fn cmd_list_projects(store: &Store) -> Result<()> {
    let projects = store.list_projects()?;
    if projects.is_empty() {
        println!("  No projects found. Add a task to create one.");
        return Ok(());
    }

    println!("\n  Projects");
    println!("  {}", "─".repeat(50));
    for project in &projects {
        let stats = store.project_stats(&project.id)?;
        println!(
            "  {:<20} {}/{} tasks | {}/{} SP | {:.0}%",
            project.name,
            stats.done_tasks,
            stats.total_tasks,
            stats.done_points,
            stats.total_points,
            stats.completion_pct()
        );
    }
    println!();
    Ok(())
}

fn cmd_complete_task(store: &Store, query: &str) -> Result<()> {
    let task = resolve_single_task(store, query)?;
    let task = store.toggle_task(&task.id)?;
    println!(
        "  {} {} -> {}",
        task.status.icon(),
        task.title,
        task.status.display()
    );
    Ok(())
}

fn cmd_delete_task(store: &Store, query: &str) -> Result<()> {
    let task = resolve_single_task(store, query)?;
    store.delete_task(&task.id)?;
    println!("  Deleted: {}", task.title);
    Ok(())
}

/// Resolve a title query to exactly one task; ambiguity is an error so a
/// scripted call never acts on the wrong task.
fn resolve_single_task(store: &Store, query: &str) -> Result<Task> {
    let mut matches = store.find_tasks_by_title(query)?;
    if matches.is_empty() {
        bail!("no tasks matching '{query}' found");
    }
    if matches.len() > 1 {
        eprintln!("Multiple tasks match '{query}':");
        for (i, task) in matches.iter().enumerate() {
            eprintln!("  {}. {}", i + 1, task.title);
        }
        bail!("please be more specific");
    }
    Ok(matches.remove(0))
}
