//! Task commands

use anyhow::{bail, Result};
use clap::Subcommand;

use super::{open_tracker, parse_minutes, parse_start, schedule_summary, Output};
use crate::domain::{ItemId, Scheduled, Status, Task};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a standalone task
    Add {
        /// Task title
        title: String,

        /// Task description
        #[arg(long, short, default_value = "")]
        description: String,

        /// Start time, ISO-8601 local (e.g. 2024-03-01T09:00)
        #[arg(long)]
        start: Option<String>,

        /// Duration in minutes
        #[arg(long)]
        duration: Option<i64>,
    },

    /// List all tasks
    List,

    /// Show a task
    Show {
        /// Task id
        id: ItemId,
    },

    /// Mark a task in progress
    Start {
        /// Task id
        id: ItemId,
    },

    /// Mark a task done
    Done {
        /// Task id
        id: ItemId,
    },

    /// Delete a task
    Delete {
        /// Task id
        id: ItemId,
    },
}

pub fn run(cmd: TaskCommands, output: &Output) -> Result<()> {
    match cmd {
        TaskCommands::Add {
            title,
            description,
            start,
            duration,
        } => {
            let (_, mut tracker) = open_tracker(output)?;
            let id = tracker.generate_id();
            let mut task = Task::new(id, title, description);
            task.start_time = parse_start(start.as_deref())?;
            task.duration = parse_minutes(duration)?;
            tracker.create_task(task)?;
            output.success(&format!("Created task {}", id));
        }

        TaskCommands::List => {
            let (_, tracker) = open_tracker(output)?;
            let tasks = tracker.tracker().all_tasks();
            if output.is_json() {
                output.data(&tasks);
                return Ok(());
            }
            for task in &tasks {
                output.row(&[
                    &task.id.to_string(),
                    task.status.as_token(),
                    &task.title,
                    &schedule_summary(task.start_time, task.duration, task.end_time()),
                ]);
            }
        }

        TaskCommands::Show { id } => {
            let (_, mut tracker) = open_tracker(output)?;
            let Some(task) = tracker.get_task(id) else {
                bail!("no task with id {id}");
            };
            if output.is_json() {
                output.data(&task);
                return Ok(());
            }
            output.row(&[&format!("Task {}", task.id), &task.title]);
            output.row(&["Status", task.status.as_token()]);
            output.row(&[
                "Schedule",
                &schedule_summary(task.start_time, task.duration, task.end_time()),
            ]);
            if !task.description.is_empty() {
                output.row(&["Description", &task.description]);
            }
        }

        TaskCommands::Start { id } => set_status(output, id, Status::InProgress)?,
        TaskCommands::Done { id } => set_status(output, id, Status::Done)?,

        TaskCommands::Delete { id } => {
            let (_, mut tracker) = open_tracker(output)?;
            tracker.remove_task(id)?;
            output.success(&format!("Deleted task {}", id));
        }
    }

    Ok(())
}

fn set_status(output: &Output, id: ItemId, status: Status) -> Result<()> {
    let (_, mut tracker) = open_tracker(output)?;
    let Some(mut task) = tracker.get_task(id) else {
        bail!("no task with id {id}");
    };
    task.status = status;
    tracker.update_task(task)?;
    output.success(&format!("Task {} is {}", id, status.as_token()));
    Ok(())
}
