//! In-memory tracker
//!
//! Owns every work item, hands out identifiers, maintains the
//! epic/subtask relationship, keeps a time-ordered schedule index over
//! tasks and subtasks, and rejects bookings that overlap an existing
//! scheduled item.
//!
//! The tracker is single-threaded by design: every operation runs to
//! completion on the calling thread and there is no internal locking.
//! Wrap it in a mutex if it ever has to be shared.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDateTime, TimeDelta};
use thiserror::Error;

use super::history::History;
use super::item::{Epic, ItemId, Scheduled, Subtask, Task, WorkItem};

#[derive(Debug, Error, PartialEq)]
pub enum TrackerError {
    #[error("'{title}' overlaps the scheduled item '{existing}'")]
    Overlap { title: String, existing: String },

    #[error("subtask '{title}' references unknown epic {epic_id}")]
    UnknownEpic { title: String, epic_id: ItemId },
}

/// Ordering key for the schedule index: start times ascending, items
/// without a start time after all items that have one, ties broken by id
/// so the order is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduleKey {
    start: Option<NaiveDateTime>,
    id: ItemId,
}

impl Ord for ScheduleKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.start, other.start) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.id.cmp(&other.id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.id.cmp(&other.id),
        }
    }
}

impl PartialOrd for ScheduleKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn key_for(item: &dyn Scheduled, id: ItemId) -> ScheduleKey {
    ScheduleKey {
        start: item.start_time(),
        id,
    }
}

/// The scheduled interval of an item, with a zero-length fallback when no
/// duration is set. Items without a start time have no interval and are
/// exempt from overlap checks.
fn interval(item: &dyn Scheduled) -> Option<(NaiveDateTime, NaiveDateTime)> {
    item.start_time()
        .map(|start| (start, start + item.duration().unwrap_or_else(TimeDelta::zero)))
}

#[derive(Debug)]
pub struct Tracker {
    next_id: ItemId,
    tasks: BTreeMap<ItemId, Task>,
    epics: BTreeMap<ItemId, Epic>,
    subtasks: BTreeMap<ItemId, Subtask>,
    history: History,
    schedule: BTreeSet<ScheduleKey>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            tasks: BTreeMap::new(),
            epics: BTreeMap::new(),
            subtasks: BTreeMap::new(),
            history: History::new(),
            schedule: BTreeSet::new(),
        }
    }

    /// Hands out the next unused identifier, starting at 1. Identifiers
    /// are never reused, even after deletion.
    pub fn generate_id(&mut self) -> ItemId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // Keeps generate_id collision-free when items arrive with ids
    // assigned elsewhere, as they do when a saved file is replayed.
    fn claim_id(&mut self, id: ItemId) {
        if id >= self.next_id {
            self.next_id = id + 1;
        }
    }

    /// Registers a task, rejecting it if its interval overlaps any
    /// scheduled item.
    pub fn create_task(&mut self, task: Task) -> Result<(), TrackerError> {
        self.validate_schedule(&task, &task.title)?;
        self.claim_id(task.id);
        self.schedule.insert(key_for(&task, task.id));
        self.tasks.insert(task.id, task);
        Ok(())
    }

    /// Registers an epic. Epics carry no schedule of their own, so there
    /// is nothing to validate.
    pub fn create_epic(&mut self, epic: Epic) {
        self.claim_id(epic.id);
        self.epics.insert(epic.id, epic);
    }

    /// Registers a subtask under its epic, rejecting it if the epic does
    /// not exist or its interval overlaps any scheduled item.
    pub fn create_subtask(&mut self, subtask: Subtask) -> Result<(), TrackerError> {
        if !self.epics.contains_key(&subtask.epic_id) {
            return Err(TrackerError::UnknownEpic {
                title: subtask.title.clone(),
                epic_id: subtask.epic_id,
            });
        }
        self.validate_schedule(&subtask, &subtask.title)?;
        self.claim_id(subtask.id);
        self.schedule.insert(key_for(&subtask, subtask.id));
        if let Some(epic) = self.epics.get_mut(&subtask.epic_id) {
            epic.add_subtask(subtask.id);
        }
        self.subtasks.insert(subtask.id, subtask);
        Ok(())
    }

    /// Replaces a stored task wholesale and re-threads the schedule
    /// index. Unknown ids are ignored. Overlap validation runs on create
    /// only; an update that introduces a clash is accepted.
    pub fn update_task(&mut self, task: Task) {
        if let Some(old) = self.tasks.get(&task.id) {
            self.schedule.remove(&key_for(old, old.id));
            self.schedule.insert(key_for(&task, task.id));
            self.tasks.insert(task.id, task);
        }
    }

    /// Replaces a stored epic's title, description and status. The
    /// subtask list is owned by the tracker and survives the update.
    pub fn update_epic(&mut self, epic: Epic) {
        if let Some(stored) = self.epics.get_mut(&epic.id) {
            stored.title = epic.title;
            stored.description = epic.description;
            stored.status = epic.status;
        }
    }

    /// Replaces a stored subtask wholesale, keeping its recorded epic
    /// membership. Like task updates, no overlap re-validation.
    pub fn update_subtask(&mut self, subtask: Subtask) {
        if let Some(old) = self.subtasks.get(&subtask.id) {
            let mut subtask = subtask;
            subtask.epic_id = old.epic_id;
            self.schedule.remove(&key_for(old, old.id));
            self.schedule.insert(key_for(&subtask, subtask.id));
            self.subtasks.insert(subtask.id, subtask);
        }
    }

    /// Removes a task along with its schedule index and history entries.
    /// Unknown ids are a no-op.
    pub fn remove_task(&mut self, id: ItemId) {
        if let Some(task) = self.tasks.remove(&id) {
            self.schedule.remove(&key_for(&task, id));
            self.history.remove(id);
        }
    }

    /// Removes an epic and cascades to every subtask it owns
    pub fn remove_epic(&mut self, id: ItemId) {
        if let Some(epic) = self.epics.remove(&id) {
            for subtask_id in epic.subtask_ids() {
                if let Some(subtask) = self.subtasks.remove(subtask_id) {
                    self.schedule.remove(&key_for(&subtask, *subtask_id));
                    self.history.remove(*subtask_id);
                }
            }
            self.history.remove(id);
        }
    }

    /// Removes a subtask and detaches it from its epic
    pub fn remove_subtask(&mut self, id: ItemId) {
        if let Some(subtask) = self.subtasks.remove(&id) {
            self.schedule.remove(&key_for(&subtask, id));
            if let Some(epic) = self.epics.get_mut(&subtask.epic_id) {
                epic.remove_subtask(id);
            }
            self.history.remove(id);
        }
    }

    /// Looks up a task. A hit is recorded in the view history.
    pub fn get_task(&mut self, id: ItemId) -> Option<Task> {
        let task = self.tasks.get(&id).cloned();
        if let Some(task) = &task {
            self.history.record(WorkItem::Task(task.clone()));
        }
        task
    }

    /// Looks up an epic. A hit is recorded in the view history.
    pub fn get_epic(&mut self, id: ItemId) -> Option<Epic> {
        let epic = self.epics.get(&id).cloned();
        if let Some(epic) = &epic {
            self.history.record(WorkItem::Epic(epic.clone()));
        }
        epic
    }

    /// Looks up a subtask. A hit is recorded in the view history.
    pub fn get_subtask(&mut self, id: ItemId) -> Option<Subtask> {
        let subtask = self.subtasks.get(&id).cloned();
        if let Some(subtask) = &subtask {
            self.history.record(WorkItem::Subtask(subtask.clone()));
        }
        subtask
    }

    /// All tasks in id order
    pub fn all_tasks(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    /// All epics in id order
    pub fn all_epics(&self) -> Vec<Epic> {
        self.epics.values().cloned().collect()
    }

    /// All subtasks in id order
    pub fn all_subtasks(&self) -> Vec<Subtask> {
        self.subtasks.values().cloned().collect()
    }

    /// The subtasks owned by an epic, in the epic's list order
    pub fn subtasks_of(&self, epic_id: ItemId) -> Vec<Subtask> {
        self.epics
            .get(&epic_id)
            .map(|epic| {
                epic.subtask_ids()
                    .iter()
                    .filter_map(|id| self.subtasks.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Derived start time of an epic; absent for unknown ids too
    pub fn epic_start_time(&self, id: ItemId) -> Option<NaiveDateTime> {
        self.epics.get(&id).and_then(|epic| epic.start_time(&self.subtasks))
    }

    /// Derived duration of an epic; zero for epics with no timed
    /// subtasks and for unknown ids
    pub fn epic_duration(&self, id: ItemId) -> TimeDelta {
        self.epics
            .get(&id)
            .map(|epic| epic.duration(&self.subtasks))
            .unwrap_or_else(TimeDelta::zero)
    }

    /// Derived end time of an epic; absent for unknown ids too
    pub fn epic_end_time(&self, id: ItemId) -> Option<NaiveDateTime> {
        self.epics.get(&id).and_then(|epic| epic.end_time(&self.subtasks))
    }

    /// Recorded views, oldest first
    pub fn history(&self) -> Vec<WorkItem> {
        self.history.snapshot()
    }

    /// Tasks and subtasks in schedule order: start times ascending,
    /// unscheduled items last
    pub fn prioritized(&self) -> Vec<WorkItem> {
        self.schedule
            .iter()
            .filter_map(|key| {
                self.tasks
                    .get(&key.id)
                    .cloned()
                    .map(WorkItem::Task)
                    .or_else(|| self.subtasks.get(&key.id).cloned().map(WorkItem::Subtask))
            })
            .collect()
    }

    fn scheduled_entry(&self, id: ItemId) -> Option<(&str, &dyn Scheduled)> {
        if let Some(task) = self.tasks.get(&id) {
            return Some((task.title.as_str(), task));
        }
        self.subtasks
            .get(&id)
            .map(|subtask| (subtask.title.as_str(), subtask as &dyn Scheduled))
    }

    // Full scan of the schedule index. Linear in the number of scheduled
    // items, which is fine at single-user scale.
    fn validate_schedule(&self, candidate: &dyn Scheduled, title: &str) -> Result<(), TrackerError> {
        let Some((new_start, new_end)) = interval(candidate) else {
            return Ok(());
        };
        for key in &self.schedule {
            let Some((existing_title, existing)) = self.scheduled_entry(key.id) else {
                continue;
            };
            let Some((start, end)) = interval(existing) else {
                continue;
            };
            // Strict comparison: intervals that merely touch do not clash
            if end > new_start && new_end > start {
                return Err(TrackerError::Overlap {
                    title: title.to_string(),
                    existing: existing_title.to_string(),
                });
            }
        }
        Ok(())
    }
}
