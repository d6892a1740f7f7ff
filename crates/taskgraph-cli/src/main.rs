//! taskgraph - dependency graph tooling over a JSON task file.
//!
//! The task file is a JSON array of task records. Mutating commands
//! (`add`, `remove`) write the file back; everything prints JSON on stdout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use taskgraph_core::app::{DependencyService, ServiceConfig};
use taskgraph_core::domain::{DependencyType, ProjectId, Task, TaskFilter, TaskId};
use taskgraph_core::graph::DependencyGraph;
use taskgraph_core::impls::{InMemoryTaskStore, TracingEventSink};
use taskgraph_core::ports::TaskStore;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "taskgraph")]
#[command(about = "Task dependency graph: cycle-safe edges, blocked checks, critical path")]
#[command(version)]
struct Cli {
    /// JSON file holding the task records
    #[arg(long, short = 't', env = "TASKGRAPH_TASKS")]
    tasks: PathBuf,

    /// TOML service config (defaults apply when omitted)
    #[arg(long, short = 'c', env = "TASKGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the adjacency list of every task (optionally one project)
    Graph {
        #[arg(long, short = 'p')]
        project: Option<ProjectId>,
    },
    /// Print the longest-duration dependency chain of a project
    CriticalPath {
        #[arg(long, short = 'p')]
        project: ProjectId,
    },
    /// Report which prerequisites keep a task blocked
    Blocked { task: TaskId },
    /// Make TASK depend on DEPENDS_ON (rejected if it would close a cycle)
    Add {
        task: TaskId,
        depends_on: TaskId,
        #[arg(long = "type", value_parser = parse_dependency_type)]
        dependency_type: Option<DependencyType>,
    },
    /// Remove the edge TASK -> DEPENDS_ON
    Remove { task: TaskId, depends_on: TaskId },
    /// Check the whole file for dependency cycles
    Validate,
}

fn parse_dependency_type(s: &str) -> Result<DependencyType, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| {
        format!(
            "unknown dependency type '{s}' \
             (expected finish-to-start, start-to-start, finish-to-finish or start-to-finish)"
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    debug!(?config, "service config");

    let tasks = read_tasks(&cli.tasks)?;
    info!(tasks = tasks.len(), file = %cli.tasks.display(), "loaded tasks");

    let store = InMemoryTaskStore::from_tasks(tasks);
    let service = DependencyService::builder(store)
        .events(TracingEventSink)
        .config(config)
        .build()
        .context("building dependency service")?;

    match cli.command {
        Commands::Graph { project } => print_json(&service.dependency_graph(project).await?)?,
        Commands::CriticalPath { project } => {
            print_json(&service.critical_path(project).await?)?
        }
        Commands::Blocked { task } => print_json(&service.check_blocked(task).await?)?,
        Commands::Add {
            task,
            depends_on,
            dependency_type,
        } => {
            let updated = service
                .add_dependency(task, depends_on, dependency_type)
                .await?;
            write_tasks(&cli.tasks, &service.store().snapshot().await)?;
            print_json(&updated)?;
        }
        Commands::Remove { task, depends_on } => {
            let updated = service.remove_dependency(task, depends_on).await?;
            write_tasks(&cli.tasks, &service.store().snapshot().await)?;
            print_json(&updated)?;
        }
        Commands::Validate => validate(&service.store().find(&TaskFilter::all()).await?)?,
    }
    Ok(())
}

fn validate(tasks: &[Task]) -> Result<()> {
    let graph = DependencyGraph::from_tasks(tasks);
    match graph.detect_cycle() {
        None => {
            println!("ok: {} tasks, no dependency cycles", graph.len());
            Ok(())
        }
        Some(cycle) => {
            let chain: Vec<String> = cycle.iter().map(ToString::to_string).collect();
            bail!("dependency cycle: {}", chain.join(" -> "))
        }
    }
}

fn read_tasks(path: &Path) -> Result<Vec<Task>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading task file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing task file {}", path.display()))
}

fn write_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
    let json = serde_json::to_string_pretty(tasks)?;
    std::fs::write(path, json + "\n")
        .with_context(|| format!("writing task file {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// stdout は JSON 出力専用なので、ログは stderr へ
fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if verbose {
        EnvFilter::new("taskgraph_core=debug,taskgraph=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("taskgraph_core=warn,taskgraph=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
