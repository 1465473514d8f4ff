//! Subtask commands

use anyhow::{bail, Result};
use clap::Subcommand;

use super::{open_tracker, parse_minutes, parse_start, schedule_summary, Output};
use crate::domain::{ItemId, Scheduled, Status, Subtask};

#[derive(Subcommand)]
pub enum SubtaskCommands {
    /// Add a subtask to an epic
    Add {
        /// Id of the owning epic
        epic: ItemId,

        /// Subtask title
        title: String,

        /// Subtask description
        #[arg(long, short, default_value = "")]
        description: String,

        /// Start time, ISO-8601 local (e.g. 2024-03-01T09:00)
        #[arg(long)]
        start: Option<String>,

        /// Duration in minutes
        #[arg(long)]
        duration: Option<i64>,
    },

    /// List subtasks
    List {
        /// Only subtasks of this epic
        #[arg(long)]
        epic: Option<ItemId>,
    },

    /// Show a subtask
    Show {
        /// Subtask id
        id: ItemId,
    },

    /// Mark a subtask in progress
    Start {
        /// Subtask id
        id: ItemId,
    },

    /// Mark a subtask done
    Done {
        /// Subtask id
        id: ItemId,
    },

    /// Delete a subtask
    Delete {
        /// Subtask id
        id: ItemId,
    },
}

pub fn run(cmd: SubtaskCommands, output: &Output) -> Result<()> {
    match cmd {
        SubtaskCommands::Add {
            epic,
            title,
            description,
            start,
            duration,
        } => {
            let (_, mut tracker) = open_tracker(output)?;
            let id = tracker.generate_id();
            let mut subtask = Subtask::new(id, epic, title, description);
            subtask.start_time = parse_start(start.as_deref())?;
            subtask.duration = parse_minutes(duration)?;
            tracker.create_subtask(subtask)?;
            output.success(&format!("Created subtask {} in epic {}", id, epic));
        }

        SubtaskCommands::List { epic } => {
            let (_, tracker) = open_tracker(output)?;
            let tracker = tracker.tracker();
            let subtasks = match epic {
                Some(epic_id) => tracker.subtasks_of(epic_id),
                None => tracker.all_subtasks(),
            };
            if output.is_json() {
                output.data(&subtasks);
                return Ok(());
            }
            for subtask in &subtasks {
                output.row(&[
                    &subtask.id.to_string(),
                    subtask.status.as_token(),
                    &subtask.title,
                    &format!("epic {}", subtask.epic_id),
                    &schedule_summary(subtask.start_time, subtask.duration, subtask.end_time()),
                ]);
            }
        }

        SubtaskCommands::Show { id } => {
            let (_, mut tracker) = open_tracker(output)?;
            let Some(subtask) = tracker.get_subtask(id) else {
                bail!("no subtask with id {id}");
            };
            if output.is_json() {
                output.data(&subtask);
                return Ok(());
            }
            output.row(&[&format!("Subtask {}", subtask.id), &subtask.title]);
            output.row(&["Epic", &subtask.epic_id.to_string()]);
            output.row(&["Status", subtask.status.as_token()]);
            output.row(&[
                "Schedule",
                &schedule_summary(subtask.start_time, subtask.duration, subtask.end_time()),
            ]);
            if !subtask.description.is_empty() {
                output.row(&["Description", &subtask.description]);
            }
        }

        SubtaskCommands::Start { id } => set_status(output, id, Status::InProgress)?,
        SubtaskCommands::Done { id } => set_status(output, id, Status::Done)?,

        SubtaskCommands::Delete { id } => {
            let (_, mut tracker) = open_tracker(output)?;
            tracker.remove_subtask(id)?;
            output.success(&format!("Deleted subtask {}", id));
        }
    }

    Ok(())
}

fn set_status(output: &Output, id: ItemId, status: Status) -> Result<()> {
    let (_, mut tracker) = open_tracker(output)?;
    let Some(mut subtask) = tracker.get_subtask(id) else {
        bail!("no subtask with id {id}");
    };
    subtask.status = status;
    tracker.update_subtask(subtask)?;
    output.success(&format!("Subtask {} is {}", id, status.as_token()));
    Ok(())
}
