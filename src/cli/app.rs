//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{epic, query, subtask, task};
use crate::storage::Project;

#[derive(Parser)]
#[command(name = "tempo")]
#[command(author, version, about = "Schedule-aware task tracking for the command line")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new tempo project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage standalone tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Manage epics
    #[command(subcommand)]
    Epic(epic::EpicCommands),

    /// Manage subtasks within an epic
    #[command(subcommand)]
    Subtask(subtask::SubtaskCommands),

    /// Show all scheduled items in start-time order
    Schedule,

    /// Show recently viewed items
    History,

    /// Show a project overview
    Status,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    match cli.command {
        Commands::Init { path } => {
            let project = Project::init(&path)?;
            output.success(&format!(
                "Initialized tempo project at {}",
                project.root().display()
            ));
        }

        Commands::Task(cmd) => task::run(cmd, &output)?,
        Commands::Epic(cmd) => epic::run(cmd, &output)?,
        Commands::Subtask(cmd) => subtask::run(cmd, &output)?,

        Commands::Schedule => query::schedule(&output)?,
        Commands::History => query::history(&output)?,
        Commands::Status => query::status(&output)?,
    }

    Ok(())
}
