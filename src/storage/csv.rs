//! Line-oriented persistence for the tracker
//!
//! The whole tracker state is written as one header line plus one record
//! per item, tasks first, then epics, then subtasks, each group in id
//! order:
//!
//! ```text
//! id,type,name,status,description,epic,duration,startTime
//! 1,TASK,Write report,NEW,Quarterly numbers,,60,2024-03-01T09:00:00
//! 2,EPIC,Release,IN_PROGRESS,Ship 1.0,,30,2024-03-02T10:00:00
//! 3,SUBTASK,Tag build,NEW,,2,30,2024-03-02T10:00:00
//! ```
//!
//! Epic records carry the duration and start derived from their subtasks
//! at save time; those two fields are ignored on load and recomputed.
//! Fields are written verbatim with no quoting, so titles and
//! descriptions must not contain commas or newlines.
//!
//! On load, a malformed record is skipped and surfaced as a warning; a
//! single bad line never aborts the rest of the file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDateTime;
use fs2::FileExt;
use thiserror::Error;

use crate::domain::{
    Epic, ItemId, ItemKind, Status, Subtask, Task, Tracker, TrackerError, WorkItem,
};

const HEADER: &str = "id,type,name,status,description,epic,duration,startTime";
const FIELD_COUNT: usize = 8;
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a record line was skipped during load
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("expected {FIELD_COUNT} fields, found {0}")]
    FieldCount(usize),

    #[error("invalid id '{0}'")]
    Id(String),

    #[error("unknown item type '{0}'")]
    Kind(String),

    #[error("unknown status '{0}'")]
    Status(String),

    #[error("invalid duration '{0}'")]
    Duration(String),

    #[error("invalid start time '{0}'")]
    StartTime(String),

    #[error("invalid epic id '{0}'")]
    EpicId(String),

    #[error("subtask record has no epic id")]
    MissingEpicId,

    #[error(transparent)]
    Rejected(#[from] TrackerError),
}

/// A record that failed to load. The surrounding lines are unaffected.
#[derive(Debug)]
pub struct LoadWarning {
    /// One-based line number within the file
    pub line: usize,
    pub error: RecordError,
}

/// Parses an ISO-8601 local date-time, with or without seconds
pub fn parse_local(value: &str) -> Option<NaiveDateTime> {
    value
        .parse()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").ok())
}

fn format_record(
    id: ItemId,
    kind: ItemKind,
    title: &str,
    status: Status,
    description: &str,
    epic_id: Option<ItemId>,
    duration: Option<chrono::TimeDelta>,
    start_time: Option<NaiveDateTime>,
) -> String {
    let epic = epic_id.map(|id| id.to_string()).unwrap_or_default();
    let minutes = duration
        .map(|duration| duration.num_minutes().to_string())
        .unwrap_or_default();
    let start = start_time
        .map(|start| start.format(TIME_FORMAT).to_string())
        .unwrap_or_default();
    format!("{id},{kind},{title},{status},{description},{epic},{minutes},{start}")
}

fn parse_record(line: &str) -> Result<WorkItem, RecordError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < FIELD_COUNT {
        return Err(RecordError::FieldCount(fields.len()));
    }

    let id: ItemId = fields[0]
        .parse()
        .map_err(|_| RecordError::Id(fields[0].to_string()))?;
    let kind = ItemKind::from_token(fields[1])
        .ok_or_else(|| RecordError::Kind(fields[1].to_string()))?;
    let title = fields[2].to_string();
    let status = Status::from_token(fields[3])
        .ok_or_else(|| RecordError::Status(fields[3].to_string()))?;
    let description = fields[4].to_string();
    let epic_id = if fields[5].is_empty() {
        None
    } else {
        Some(
            fields[5]
                .parse::<ItemId>()
                .map_err(|_| RecordError::EpicId(fields[5].to_string()))?,
        )
    };
    let duration = if fields[6].is_empty() {
        None
    } else {
        let minutes: i64 = fields[6]
            .parse()
            .map_err(|_| RecordError::Duration(fields[6].to_string()))?;
        if minutes < 0 {
            return Err(RecordError::Duration(fields[6].to_string()));
        }
        Some(chrono::TimeDelta::minutes(minutes))
    };
    let start_time = if fields[7].is_empty() {
        None
    } else {
        Some(parse_local(fields[7]).ok_or_else(|| RecordError::StartTime(fields[7].to_string()))?)
    };

    Ok(match kind {
        ItemKind::Task => {
            let mut task = Task::new(id, title, description);
            task.status = status;
            task.duration = duration;
            task.start_time = start_time;
            WorkItem::Task(task)
        }
        ItemKind::Epic => {
            // Derived fields in the record are ignored; an epic's
            // schedule always comes from its subtasks.
            let mut epic = Epic::new(id, title, description);
            epic.status = status;
            WorkItem::Epic(epic)
        }
        ItemKind::Subtask => {
            let epic_id = epic_id.ok_or(RecordError::MissingEpicId)?;
            let mut subtask = Subtask::new(id, epic_id, title, description);
            subtask.status = status;
            subtask.duration = duration;
            subtask.start_time = start_time;
            WorkItem::Subtask(subtask)
        }
    })
}

/// Store for tracker state in the line-oriented record format
pub struct TrackerStore {
    path: PathBuf,
}

impl TrackerStore {
    /// Creates a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".tempo").join("tracker.csv"))
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the full tracker state, replacing any previous contents.
    /// The write goes to a temp file first and is renamed into place.
    pub fn save(&self, tracker: &Tracker) -> Result<(), PersistenceError> {
        let write_err = |source: std::io::Error| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let temp_path = self.path.with_extension("csv.tmp");
        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(write_err)?;
            file.lock_exclusive().map_err(write_err)?;

            let mut writer = BufWriter::new(&file);
            writeln!(writer, "{HEADER}").map_err(write_err)?;
            for task in tracker.all_tasks() {
                let line = format_record(
                    task.id,
                    ItemKind::Task,
                    &task.title,
                    task.status,
                    &task.description,
                    None,
                    task.duration,
                    task.start_time,
                );
                writeln!(writer, "{line}").map_err(write_err)?;
            }
            for epic in tracker.all_epics() {
                let line = format_record(
                    epic.id,
                    ItemKind::Epic,
                    &epic.title,
                    epic.status,
                    &epic.description,
                    None,
                    Some(tracker.epic_duration(epic.id)),
                    tracker.epic_start_time(epic.id),
                );
                writeln!(writer, "{line}").map_err(write_err)?;
            }
            for subtask in tracker.all_subtasks() {
                let line = format_record(
                    subtask.id,
                    ItemKind::Subtask,
                    &subtask.title,
                    subtask.status,
                    &subtask.description,
                    Some(subtask.epic_id),
                    subtask.duration,
                    subtask.start_time,
                );
                writeln!(writer, "{line}").map_err(write_err)?;
            }
            writer.flush().map_err(write_err)?;
        }

        fs::rename(&temp_path, &self.path).map_err(write_err)
    }

    /// Reads the store back into a fresh tracker. Records replay through
    /// the tracker's normal creation calls so relationship and overlap
    /// invariants are re-derived rather than trusted from the file.
    /// A missing or empty file yields an empty tracker.
    pub fn load(&self) -> Result<(Tracker, Vec<LoadWarning>), PersistenceError> {
        let mut tracker = Tracker::new();
        let mut warnings = Vec::new();

        if !self.path.exists() {
            return Ok((tracker, warnings));
        }

        let read_err = |source: std::io::Error| PersistenceError::Read {
            path: self.path.clone(),
            source,
        };

        let file = File::open(&self.path).map_err(read_err)?;
        file.lock_shared().map_err(read_err)?;
        let reader = BufReader::new(&file);

        // Subtasks register last so records that precede their epic in
        // the file still load.
        let mut deferred: Vec<(usize, Subtask)> = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(read_err)?;
            let line_number = index + 1;
            if line_number == 1 || line.trim().is_empty() {
                continue; // header
            }
            match parse_record(&line) {
                Ok(WorkItem::Task(task)) => {
                    if let Err(error) = tracker.create_task(task) {
                        warnings.push(LoadWarning {
                            line: line_number,
                            error: error.into(),
                        });
                    }
                }
                Ok(WorkItem::Epic(epic)) => tracker.create_epic(epic),
                Ok(WorkItem::Subtask(subtask)) => deferred.push((line_number, subtask)),
                Err(error) => warnings.push(LoadWarning {
                    line: line_number,
                    error,
                }),
            }
        }

        for (line_number, subtask) in deferred {
            if let Err(error) = tracker.create_subtask(subtask) {
                warnings.push(LoadWarning {
                    line: line_number,
                    error: error.into(),
                });
            }
        }

        Ok((tracker, warnings))
    }
}

/// A tracker bound to a backing file: every mutation is followed by a
/// full-state save. Memory is mutated first, so a failed save leaves the
/// tracker usable; memory and disk then diverge until the next
/// successful save.
pub struct FileTracker {
    tracker: Tracker,
    store: TrackerStore,
}

impl FileTracker {
    /// Starts from an empty tracker without touching the file
    pub fn new(store: TrackerStore) -> Self {
        Self {
            tracker: Tracker::new(),
            store,
        }
    }

    /// Loads existing state from the store's file
    pub fn load(store: TrackerStore) -> Result<(Self, Vec<LoadWarning>), PersistenceError> {
        let (tracker, warnings) = store.load()?;
        Ok((Self { tracker, store }, warnings))
    }

    /// The underlying tracker, for queries
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn generate_id(&mut self) -> ItemId {
        self.tracker.generate_id()
    }

    pub fn create_task(&mut self, task: Task) -> Result<()> {
        self.tracker.create_task(task)?;
        self.store.save(&self.tracker)?;
        Ok(())
    }

    pub fn create_epic(&mut self, epic: Epic) -> Result<()> {
        self.tracker.create_epic(epic);
        self.store.save(&self.tracker)?;
        Ok(())
    }

    pub fn create_subtask(&mut self, subtask: Subtask) -> Result<()> {
        self.tracker.create_subtask(subtask)?;
        self.store.save(&self.tracker)?;
        Ok(())
    }

    pub fn update_task(&mut self, task: Task) -> Result<()> {
        self.tracker.update_task(task);
        self.store.save(&self.tracker)?;
        Ok(())
    }

    pub fn update_epic(&mut self, epic: Epic) -> Result<()> {
        self.tracker.update_epic(epic);
        self.store.save(&self.tracker)?;
        Ok(())
    }

    pub fn update_subtask(&mut self, subtask: Subtask) -> Result<()> {
        self.tracker.update_subtask(subtask);
        self.store.save(&self.tracker)?;
        Ok(())
    }

    pub fn remove_task(&mut self, id: ItemId) -> Result<()> {
        self.tracker.remove_task(id);
        self.store.save(&self.tracker)?;
        Ok(())
    }

    pub fn remove_epic(&mut self, id: ItemId) -> Result<()> {
        self.tracker.remove_epic(id);
        self.store.save(&self.tracker)?;
        Ok(())
    }

    pub fn remove_subtask(&mut self, id: ItemId) -> Result<()> {
        self.tracker.remove_subtask(id);
        self.store.save(&self.tracker)?;
        Ok(())
    }

    /// Looks up a task, recording the view in the tracker's history
    pub fn get_task(&mut self, id: ItemId) -> Option<Task> {
        self.tracker.get_task(id)
    }

    /// Looks up an epic, recording the view in the tracker's history
    pub fn get_epic(&mut self, id: ItemId) -> Option<Epic> {
        self.tracker.get_epic(id)
    }

    /// Looks up a subtask, recording the view in the tracker's history
    pub fn get_subtask(&mut self, id: ItemId) -> Option<Subtask> {
        self.tracker.get_subtask(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    fn time(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    fn timed_task(id: ItemId, title: &str, start: &str, minutes: i64) -> Task {
        let mut task = Task::new(id, title, "");
        task.start_time = Some(time(start));
        task.duration = Some(TimeDelta::minutes(minutes));
        task
    }

    fn populated_tracker() -> Tracker {
        let mut tracker = Tracker::new();
        let mut task = timed_task(1, "Write report", "2024-03-01T09:00:00", 60);
        task.description = "Quarterly numbers".to_string();
        task.status = Status::InProgress;
        tracker.create_task(task).unwrap();
        tracker.create_task(Task::new(2, "Someday", "")).unwrap();

        let mut epic = Epic::new(3, "Release", "Ship 1.0");
        epic.status = Status::New;
        tracker.create_epic(epic);

        let mut subtask = Subtask::new(4, 3, "Tag build", "v1.0.0");
        subtask.start_time = Some(time("2024-03-02T10:00:00"));
        subtask.duration = Some(TimeDelta::minutes(30));
        tracker.create_subtask(subtask).unwrap();
        tracker
            .create_subtask(Subtask::new(5, 3, "Celebrate", ""))
            .unwrap();

        tracker
    }

    #[test]
    fn load_missing_file_yields_empty_tracker() {
        let dir = TempDir::new().unwrap();
        let store = TrackerStore::new(dir.path().join("tracker.csv"));

        let (tracker, warnings) = store.load().unwrap();
        assert!(tracker.all_tasks().is_empty());
        assert!(tracker.all_epics().is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn load_empty_file_yields_empty_tracker() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracker.csv");
        fs::write(&path, "").unwrap();

        let (tracker, warnings) = TrackerStore::new(path).load().unwrap();
        assert!(tracker.all_tasks().is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let dir = TempDir::new().unwrap();
        let store = TrackerStore::new(dir.path().join("tracker.csv"));
        let original = populated_tracker();

        store.save(&original).unwrap();
        let (loaded, warnings) = store.load().unwrap();
        assert!(warnings.is_empty());

        assert_eq!(loaded.all_tasks(), original.all_tasks());
        assert_eq!(loaded.all_subtasks(), original.all_subtasks());
        assert_eq!(loaded.all_epics(), original.all_epics());
        assert_eq!(
            loaded.get_epic_subtask_ids(),
            original.get_epic_subtask_ids()
        );
    }

    // Flattened epic membership for equality checks
    trait EpicMembership {
        fn get_epic_subtask_ids(&self) -> Vec<(ItemId, Vec<ItemId>)>;
    }

    impl EpicMembership for Tracker {
        fn get_epic_subtask_ids(&self) -> Vec<(ItemId, Vec<ItemId>)> {
            self.all_epics()
                .iter()
                .map(|epic| (epic.id, epic.subtask_ids().to_vec()))
                .collect()
        }
    }

    #[test]
    fn round_trip_keeps_schedule_order() {
        let dir = TempDir::new().unwrap();
        let store = TrackerStore::new(dir.path().join("tracker.csv"));
        let original = populated_tracker();

        store.save(&original).unwrap();
        let (loaded, _) = store.load().unwrap();

        let order = |tracker: &Tracker| -> Vec<ItemId> {
            tracker.prioritized().iter().map(|item| item.id()).collect()
        };
        assert_eq!(order(&loaded), order(&original));
    }

    #[test]
    fn generate_id_stays_unique_after_load() {
        let dir = TempDir::new().unwrap();
        let store = TrackerStore::new(dir.path().join("tracker.csv"));
        store.save(&populated_tracker()).unwrap();

        let (mut loaded, _) = store.load().unwrap();
        let id = loaded.generate_id();
        assert_eq!(id, 6);
    }

    #[test]
    fn malformed_line_is_skipped_with_a_warning() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracker.csv");
        fs::write(
            &path,
            "id,type,name,status,description,epic,duration,startTime\n\
             1,TASK,Good,NEW,,,60,2024-03-01T09:00:00\n\
             2,TASK,Broken,NEW,,\n\
             3,TASK,Also good,DONE,,,,\n",
        )
        .unwrap();

        let (tracker, warnings) = TrackerStore::new(path).load().unwrap();
        assert_eq!(tracker.all_tasks().len(), 2);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line, 3);
        assert_eq!(warnings[0].error, RecordError::FieldCount(6));
    }

    #[test]
    fn bad_field_values_are_skipped_individually() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracker.csv");
        fs::write(
            &path,
            "id,type,name,status,description,epic,duration,startTime\n\
             x,TASK,Bad id,NEW,,,,\n\
             2,STORY,Bad kind,NEW,,,,\n\
             3,TASK,Bad status,STARTED,,,,\n\
             4,TASK,Bad duration,NEW,,,soon,\n\
             5,TASK,Bad start,NEW,,,60,tomorrow\n\
             6,SUBTASK,No epic,NEW,,,,\n\
             7,TASK,Good,NEW,,,,\n",
        )
        .unwrap();

        let (tracker, warnings) = TrackerStore::new(path).load().unwrap();
        assert_eq!(tracker.all_tasks().len(), 1);
        assert_eq!(tracker.all_tasks()[0].title, "Good");
        assert_eq!(warnings.len(), 6);
        assert!(warnings
            .iter()
            .any(|w| w.error == RecordError::MissingEpicId));
    }

    #[test]
    fn empty_status_field_reads_as_new() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracker.csv");
        fs::write(
            &path,
            "id,type,name,status,description,epic,duration,startTime\n\
             1,TASK,Legacy,,,,,\n",
        )
        .unwrap();

        let (tracker, warnings) = TrackerStore::new(path).load().unwrap();
        assert!(warnings.is_empty());
        assert_eq!(tracker.all_tasks()[0].status, Status::New);
    }

    #[test]
    fn subtask_before_its_epic_still_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracker.csv");
        fs::write(
            &path,
            "id,type,name,status,description,epic,duration,startTime\n\
             4,SUBTASK,Tag build,NEW,,3,30,2024-03-02T10:00:00\n\
             3,EPIC,Release,NEW,,,0,\n",
        )
        .unwrap();

        let (tracker, warnings) = TrackerStore::new(path).load().unwrap();
        assert!(warnings.is_empty());
        assert_eq!(tracker.all_subtasks().len(), 1);
        assert_eq!(tracker.all_epics()[0].subtask_ids(), &[4]);
    }

    #[test]
    fn replay_rejections_become_warnings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracker.csv");
        // Hand-edited file with two clashing bookings
        fs::write(
            &path,
            "id,type,name,status,description,epic,duration,startTime\n\
             1,TASK,First,NEW,,,60,2024-03-01T09:00:00\n\
             2,TASK,Clash,NEW,,,60,2024-03-01T09:30:00\n",
        )
        .unwrap();

        let (tracker, warnings) = TrackerStore::new(path).load().unwrap();
        assert_eq!(tracker.all_tasks().len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0].error, RecordError::Rejected(_)));
    }

    #[test]
    fn save_is_atomic() {
        let dir = TempDir::new().unwrap();
        let store = TrackerStore::new(dir.path().join("tracker.csv"));

        store.save(&populated_tracker()).unwrap();

        let temp_path = store.path().with_extension("csv.tmp");
        assert!(!temp_path.exists());
        assert!(store.path().exists());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = TrackerStore::new(dir.path().join("nested").join("dir").join("tracker.csv"));

        store.save(&Tracker::new()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn file_tracker_saves_on_every_mutation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracker.csv");
        let mut tracker = FileTracker::new(TrackerStore::new(&path));

        let id = tracker.generate_id();
        tracker.create_task(Task::new(id, "Persisted", "")).unwrap();

        // A second handle sees the task immediately
        let (reloaded, _) = TrackerStore::new(&path).load().unwrap();
        assert_eq!(reloaded.all_tasks().len(), 1);

        tracker.remove_task(id).unwrap();
        let (reloaded, _) = TrackerStore::new(&path).load().unwrap();
        assert!(reloaded.all_tasks().is_empty());
    }

    #[test]
    fn file_tracker_rejection_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracker.csv");
        let mut tracker = FileTracker::new(TrackerStore::new(&path));
        tracker
            .create_task(timed_task(1, "A", "2024-03-01T09:00:00", 60))
            .unwrap();

        let err = tracker
            .create_task(timed_task(2, "B", "2024-03-01T09:30:00", 60))
            .unwrap_err();
        assert!(err.downcast_ref::<TrackerError>().is_some());

        let (reloaded, _) = TrackerStore::new(&path).load().unwrap();
        assert_eq!(reloaded.all_tasks().len(), 1);
    }
}
