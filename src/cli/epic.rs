//! Epic commands

use anyhow::{bail, Result};
use clap::Subcommand;

use super::{open_tracker, schedule_summary, Output};
use crate::domain::{Epic, ItemId};

#[derive(Subcommand)]
pub enum EpicCommands {
    /// Add an epic
    Add {
        /// Epic title
        title: String,

        /// Epic description
        #[arg(long, short, default_value = "")]
        description: String,
    },

    /// List all epics with their derived schedules
    List,

    /// Show an epic and its subtasks
    Show {
        /// Epic id
        id: ItemId,
    },

    /// Delete an epic and all of its subtasks
    Delete {
        /// Epic id
        id: ItemId,
    },
}

pub fn run(cmd: EpicCommands, output: &Output) -> Result<()> {
    match cmd {
        EpicCommands::Add { title, description } => {
            let (_, mut tracker) = open_tracker(output)?;
            let id = tracker.generate_id();
            tracker.create_epic(Epic::new(id, title, description))?;
            output.success(&format!("Created epic {}", id));
        }

        EpicCommands::List => {
            let (_, tracker) = open_tracker(output)?;
            let tracker = tracker.tracker();
            let epics = tracker.all_epics();
            if output.is_json() {
                output.data(&epics);
                return Ok(());
            }
            for epic in &epics {
                output.row(&[
                    &epic.id.to_string(),
                    epic.status.as_token(),
                    &epic.title,
                    &schedule_summary(
                        tracker.epic_start_time(epic.id),
                        Some(tracker.epic_duration(epic.id)),
                        tracker.epic_end_time(epic.id),
                    ),
                ]);
            }
        }

        EpicCommands::Show { id } => {
            let (_, mut tracker) = open_tracker(output)?;
            let Some(epic) = tracker.get_epic(id) else {
                bail!("no epic with id {id}");
            };
            let tracker = tracker.tracker();
            if output.is_json() {
                output.data(&serde_json::json!({
                    "epic": epic,
                    "start_time": tracker.epic_start_time(id),
                    "duration": tracker.epic_duration(id).num_minutes(),
                    "end_time": tracker.epic_end_time(id),
                    "subtasks": tracker.subtasks_of(id),
                }));
                return Ok(());
            }
            output.row(&[&format!("Epic {}", epic.id), &epic.title]);
            output.row(&["Status", epic.status.as_token()]);
            output.row(&[
                "Schedule",
                &schedule_summary(
                    tracker.epic_start_time(id),
                    Some(tracker.epic_duration(id)),
                    tracker.epic_end_time(id),
                ),
            ]);
            if !epic.description.is_empty() {
                output.row(&["Description", &epic.description]);
            }
            output.blank();
            for subtask in tracker.subtasks_of(id) {
                output.row(&[
                    &subtask.id.to_string(),
                    subtask.status.as_token(),
                    &subtask.title,
                ]);
            }
        }

        EpicCommands::Delete { id } => {
            let (_, mut tracker) = open_tracker(output)?;
            tracker.remove_epic(id)?;
            output.success(&format!("Deleted epic {} and its subtasks", id));
        }
    }

    Ok(())
}
