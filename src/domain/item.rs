//! Work item domain model
//!
//! Three kinds of work item share an identity and status core: standalone
//! tasks, epics, and subtasks owned by an epic. Tasks and subtasks carry
//! their own schedule (optional start time plus optional duration); an
//! epic stores no schedule of its own and derives start, duration and end
//! from its subtasks on every read.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// Work item identifier. Positive, unique across all item kinds, handed
/// out monotonically by the tracker.
pub type ItemId = u32;

/// Status of a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    New,
    InProgress,
    Done,
}

impl Status {
    /// Returns true if this status represents completion
    pub fn is_done(&self) -> bool {
        matches!(self, Status::Done)
    }

    /// Returns true if this item is currently being worked on
    pub fn is_active(&self) -> bool {
        matches!(self, Status::InProgress)
    }

    /// Wire token used by the record format
    pub fn as_token(&self) -> &'static str {
        match self {
            Status::New => "NEW",
            Status::InProgress => "IN_PROGRESS",
            Status::Done => "DONE",
        }
    }

    /// Parses a record-format token. An empty token reads as `New`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "" | "NEW" => Some(Status::New),
            "IN_PROGRESS" => Some(Status::InProgress),
            "DONE" => Some(Status::Done),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Serde adapter storing an optional duration as whole minutes
pub mod duration_minutes {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<TimeDelta>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.num_minutes()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<TimeDelta>, D::Error> {
        let minutes = Option::<i64>::deserialize(deserializer)?;
        Ok(minutes.map(TimeDelta::minutes))
    }
}

/// Common scheduling surface for items that carry their own start and
/// duration.
pub trait Scheduled {
    fn start_time(&self) -> Option<NaiveDateTime>;
    fn duration(&self) -> Option<TimeDelta>;

    /// End of the scheduled interval, present only when both start and
    /// duration are set.
    fn end_time(&self) -> Option<NaiveDateTime> {
        match (self.start_time(), self.duration()) {
            (Some(start), Some(duration)) => Some(start + duration),
            _ => None,
        }
    }
}

/// A standalone unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub status: Status,
    /// Planned duration, whole minutes
    #[serde(with = "duration_minutes")]
    pub duration: Option<TimeDelta>,
    /// Planned start, local time without zone
    pub start_time: Option<NaiveDateTime>,
}

impl Task {
    /// Creates a new task with no schedule
    pub fn new(id: ItemId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            status: Status::New,
            duration: None,
            start_time: None,
        }
    }
}

impl Scheduled for Task {
    fn start_time(&self) -> Option<NaiveDateTime> {
        self.start_time
    }

    fn duration(&self) -> Option<TimeDelta> {
        self.duration
    }
}

/// A unit of work belonging to an epic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: ItemId,
    /// The epic this subtask belongs to, fixed at creation
    pub epic_id: ItemId,
    pub title: String,
    pub description: String,
    pub status: Status,
    #[serde(with = "duration_minutes")]
    pub duration: Option<TimeDelta>,
    pub start_time: Option<NaiveDateTime>,
}

impl Subtask {
    /// Creates a new subtask with no schedule
    pub fn new(
        id: ItemId,
        epic_id: ItemId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            epic_id,
            title: title.into(),
            description: description.into(),
            status: Status::New,
            duration: None,
            start_time: None,
        }
    }
}

impl Scheduled for Subtask {
    fn start_time(&self) -> Option<NaiveDateTime> {
        self.start_time
    }

    fn duration(&self) -> Option<TimeDelta> {
        self.duration
    }
}

/// A grouping of subtasks
///
/// The subtask list keeps insertion order. Derived scheduling attributes
/// take the owning tracker's subtask map as an explicit parameter, so an
/// epic can be reasoned about without any shared global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub status: Status,
    subtask_ids: Vec<ItemId>,
}

impl Epic {
    /// Creates a new epic with no subtasks
    pub fn new(id: ItemId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            status: Status::New,
            subtask_ids: Vec::new(),
        }
    }

    /// Ids of the owned subtasks, in the order they were added
    pub fn subtask_ids(&self) -> &[ItemId] {
        &self.subtask_ids
    }

    pub(crate) fn add_subtask(&mut self, id: ItemId) {
        self.subtask_ids.push(id);
    }

    pub(crate) fn remove_subtask(&mut self, id: ItemId) {
        self.subtask_ids.retain(|subtask_id| *subtask_id != id);
    }

    /// Earliest start time among owned subtasks that have one
    pub fn start_time(&self, subtasks: &BTreeMap<ItemId, Subtask>) -> Option<NaiveDateTime> {
        self.subtask_ids
            .iter()
            .filter_map(|id| subtasks.get(id))
            .filter_map(|subtask| subtask.start_time)
            .min()
    }

    /// Sum of owned subtask durations. Zero, never absent, when no
    /// subtask has a duration set.
    pub fn duration(&self, subtasks: &BTreeMap<ItemId, Subtask>) -> TimeDelta {
        self.subtask_ids
            .iter()
            .filter_map(|id| subtasks.get(id))
            .filter_map(|subtask| subtask.duration)
            .fold(TimeDelta::zero(), |total, duration| total + duration)
    }

    /// Latest end time among owned subtasks that have one
    pub fn end_time(&self, subtasks: &BTreeMap<ItemId, Subtask>) -> Option<NaiveDateTime> {
        self.subtask_ids
            .iter()
            .filter_map(|id| subtasks.get(id))
            .filter_map(|subtask| subtask.end_time())
            .max()
    }
}

/// Kind discriminator, matched exhaustively by the record codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Task,
    Epic,
    Subtask,
}

impl ItemKind {
    /// Wire token used by the record format
    pub fn as_token(&self) -> &'static str {
        match self {
            ItemKind::Task => "TASK",
            ItemKind::Epic => "EPIC",
            ItemKind::Subtask => "SUBTASK",
        }
    }

    /// Parses a record-format token
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TASK" => Some(ItemKind::Task),
            "EPIC" => Some(ItemKind::Epic),
            "SUBTASK" => Some(ItemKind::Subtask),
            _ => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Tagged union over the three item kinds, used by the view history and
/// the record codec
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkItem {
    Task(Task),
    Epic(Epic),
    Subtask(Subtask),
}

impl WorkItem {
    pub fn id(&self) -> ItemId {
        match self {
            WorkItem::Task(task) => task.id,
            WorkItem::Epic(epic) => epic.id,
            WorkItem::Subtask(subtask) => subtask.id,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            WorkItem::Task(_) => ItemKind::Task,
            WorkItem::Epic(_) => ItemKind::Epic,
            WorkItem::Subtask(_) => ItemKind::Subtask,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            WorkItem::Task(task) => &task.title,
            WorkItem::Epic(epic) => &epic.title,
            WorkItem::Subtask(subtask) => &subtask.title,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            WorkItem::Task(task) => task.status,
            WorkItem::Epic(epic) => epic.status,
            WorkItem::Subtask(subtask) => subtask.status,
        }
    }
}

impl From<Task> for WorkItem {
    fn from(task: Task) -> Self {
        WorkItem::Task(task)
    }
}

impl From<Epic> for WorkItem {
    fn from(epic: Epic) -> Self {
        WorkItem::Epic(epic)
    }
}

impl From<Subtask> for WorkItem {
    fn from(subtask: Subtask) -> Self {
        WorkItem::Subtask(subtask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn new_task_has_new_status_and_no_schedule() {
        let task = Task::new(1, "Write report", "Quarterly numbers");
        assert_eq!(task.status, Status::New);
        assert!(task.start_time.is_none());
        assert!(task.duration.is_none());
        assert!(task.end_time().is_none());
    }

    #[test]
    fn end_time_is_start_plus_duration() {
        let mut task = Task::new(1, "Call", "");
        task.start_time = Some(time("2024-03-01T09:00:00"));
        task.duration = Some(TimeDelta::minutes(45));

        assert_eq!(task.end_time(), Some(time("2024-03-01T09:45:00")));
    }

    #[test]
    fn end_time_absent_when_either_field_missing() {
        let mut task = Task::new(1, "Call", "");
        task.start_time = Some(time("2024-03-01T09:00:00"));
        assert!(task.end_time().is_none());

        task.start_time = None;
        task.duration = Some(TimeDelta::minutes(45));
        assert!(task.end_time().is_none());
    }

    #[test]
    fn empty_epic_derives_nothing() {
        let epic = Epic::new(1, "Release", "");
        let subtasks = BTreeMap::new();

        assert!(epic.start_time(&subtasks).is_none());
        assert_eq!(epic.duration(&subtasks), TimeDelta::zero());
        assert!(epic.end_time(&subtasks).is_none());
    }

    #[test]
    fn epic_derives_from_subtasks() {
        let mut epic = Epic::new(1, "Release", "");
        let mut subtasks = BTreeMap::new();

        let mut first = Subtask::new(2, 1, "Tag build", "");
        first.start_time = Some(time("2024-03-02T10:00:00"));
        first.duration = Some(TimeDelta::minutes(30));

        let mut second = Subtask::new(3, 1, "Publish notes", "");
        second.start_time = Some(time("2024-03-02T12:00:00"));
        second.duration = Some(TimeDelta::minutes(15));

        // No schedule at all; must not affect the derivation
        let third = Subtask::new(4, 1, "Celebrate", "");

        for subtask in [&first, &second, &third] {
            epic.add_subtask(subtask.id);
        }
        subtasks.insert(first.id, first);
        subtasks.insert(second.id, second);
        subtasks.insert(third.id, third);

        assert_eq!(epic.start_time(&subtasks), Some(time("2024-03-02T10:00:00")));
        assert_eq!(epic.duration(&subtasks), TimeDelta::minutes(45));
        assert_eq!(epic.end_time(&subtasks), Some(time("2024-03-02T12:15:00")));
    }

    #[test]
    fn epic_subtask_list_keeps_insertion_order() {
        let mut epic = Epic::new(1, "Release", "");
        epic.add_subtask(9);
        epic.add_subtask(3);
        epic.add_subtask(7);
        assert_eq!(epic.subtask_ids(), &[9, 3, 7]);

        epic.remove_subtask(3);
        assert_eq!(epic.subtask_ids(), &[9, 7]);
    }

    #[test]
    fn status_tokens_round_trip() {
        for status in [Status::New, Status::InProgress, Status::Done] {
            assert_eq!(Status::from_token(status.as_token()), Some(status));
        }
        // Legacy files may leave the status field empty
        assert_eq!(Status::from_token(""), Some(Status::New));
        assert_eq!(Status::from_token("STARTED"), None);
    }

    #[test]
    fn kind_tokens_round_trip() {
        for kind in [ItemKind::Task, ItemKind::Epic, ItemKind::Subtask] {
            assert_eq!(ItemKind::from_token(kind.as_token()), Some(kind));
        }
        assert_eq!(ItemKind::from_token("STORY"), None);
    }

    #[test]
    fn task_serializes_duration_as_minutes() {
        let mut task = Task::new(1, "Call", "");
        task.duration = Some(TimeDelta::minutes(90));

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["duration"], serde_json::json!(90));

        let parsed: Task = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.duration, Some(TimeDelta::minutes(90)));
    }
}
