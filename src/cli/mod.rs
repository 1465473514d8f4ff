//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project management | `init`, `status` |
//! | Task | Standalone work items | `task add`, `task done` |
//! | Epic | Groupings with derived schedules | `epic add`, `epic show` |
//! | Subtask | Work items inside an epic | `subtask add`, `subtask done` |
//! | Query | Schedule and history views | `schedule`, `history` |
//!
//! All commands support `--format text|json` and `--verbose`. Records
//! skipped while loading the tracker file are reported on stderr.
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod epic;
mod output;
mod query;
mod subtask;
mod task;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};

use anyhow::Result;
use chrono::{NaiveDateTime, TimeDelta};

use crate::storage::{parse_local, FileTracker, Project};

/// Opens the current project and loads its tracker, reporting any
/// records that were skipped.
pub(crate) fn open_tracker(output: &Output) -> Result<(Project, FileTracker)> {
    let project = Project::open_current()?;
    output.verbose(&format!("Project root: {}", project.root().display()));

    let (tracker, warnings) = FileTracker::load(project.tracker_store())?;
    for warning in &warnings {
        output.warn(&format!(
            "skipped record at line {}: {}",
            warning.line, warning.error
        ));
    }
    Ok((project, tracker))
}

pub(crate) fn parse_start(value: Option<&str>) -> Result<Option<NaiveDateTime>> {
    value
        .map(|s| {
            parse_local(s)
                .ok_or_else(|| anyhow::anyhow!("invalid start time '{s}' (expected e.g. 2024-03-01T09:00)"))
        })
        .transpose()
}

pub(crate) fn parse_minutes(value: Option<i64>) -> Result<Option<TimeDelta>> {
    value
        .map(|minutes| {
            anyhow::ensure!(minutes >= 0, "duration must be non-negative, got {minutes}");
            Ok(TimeDelta::minutes(minutes))
        })
        .transpose()
}

/// Renders an optional schedule as `start .. end (Nm)` for table rows
pub(crate) fn schedule_summary(
    start: Option<NaiveDateTime>,
    duration: Option<TimeDelta>,
    end: Option<NaiveDateTime>,
) -> String {
    let Some(start) = start else {
        return "unscheduled".to_string();
    };
    let mut summary = start.format("%Y-%m-%d %H:%M").to_string();
    if let Some(end) = end {
        summary.push_str(&format!(" .. {}", end.format("%H:%M")));
    }
    if let Some(duration) = duration {
        summary.push_str(&format!(" ({}m)", duration.num_minutes()));
    }
    summary
}
