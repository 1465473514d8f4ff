//! Schedule, history and status views

use anyhow::Result;

use super::{open_tracker, schedule_summary, Output};
use crate::domain::{Scheduled, WorkItem};

/// Shows all scheduled tasks and subtasks in start-time order, with
/// unscheduled items last
pub fn schedule(output: &Output) -> Result<()> {
    let (_, tracker) = open_tracker(output)?;
    let items = tracker.tracker().prioritized();
    if output.is_json() {
        output.data(&items);
        return Ok(());
    }
    for item in &items {
        let (start, duration, end) = match item {
            WorkItem::Task(task) => (task.start_time, task.duration, task.end_time()),
            WorkItem::Subtask(subtask) => {
                (subtask.start_time, subtask.duration, subtask.end_time())
            }
            WorkItem::Epic(_) => (None, None, None), // epics are never scheduled directly
        };
        output.row(&[
            &item.id().to_string(),
            item.kind().as_token(),
            item.title(),
            &schedule_summary(start, duration, end),
        ]);
    }
    Ok(())
}

/// Shows the most recently viewed items, oldest first, bounded by the
/// configured history limit
pub fn history(output: &Output) -> Result<()> {
    let (project, tracker) = open_tracker(output)?;
    let mut entries = tracker.tracker().history();

    let limit = project.config().history_limit;
    if entries.len() > limit {
        entries = entries.split_off(entries.len() - limit);
    }

    if output.is_json() {
        output.data(&entries);
        return Ok(());
    }
    for item in &entries {
        output.row(&[
            &item.id().to_string(),
            item.kind().as_token(),
            item.title(),
        ]);
    }
    Ok(())
}

/// Shows an overview of the project
pub fn status(output: &Output) -> Result<()> {
    let (_, tracker) = open_tracker(output)?;
    let tracker = tracker.tracker();

    let tasks = tracker.all_tasks();
    let epics = tracker.all_epics();
    let subtasks = tracker.all_subtasks();
    let done = tasks.iter().filter(|t| t.status.is_done()).count()
        + subtasks.iter().filter(|s| s.status.is_done()).count();

    if output.is_json() {
        output.data(&serde_json::json!({
            "tasks": tasks.len(),
            "epics": epics.len(),
            "subtasks": subtasks.len(),
            "done": done,
        }));
        return Ok(());
    }
    output.row(&["Tasks", &tasks.len().to_string()]);
    output.row(&["Epics", &epics.len().to_string()]);
    output.row(&["Subtasks", &subtasks.len().to_string()]);
    output.row(&["Done", &done.to_string()]);
    Ok(())
}
