//! Tempo - schedule-aware task tracking for the command line
//!
//! Tempo keeps a hierarchy of work items (standalone tasks, epics and
//! the subtasks they own) in a single in-memory tracker with a
//! time-ordered schedule view, rejects bookings that overlap an existing
//! scheduled item, and persists everything to a flat text file under the
//! project's `.tempo/` directory after every change.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{Epic, ItemId, Status, Subtask, Task, Tracker, TrackerError, WorkItem};
pub use storage::{FileTracker, TrackerStore};
