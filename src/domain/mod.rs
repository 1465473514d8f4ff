//! Domain models for Tempo
//!
//! Contains the core tracking engine without any I/O concerns.

mod history;
mod item;
mod tracker;

pub use history::History;
pub use item::{duration_minutes, Epic, ItemId, ItemKind, Scheduled, Status, Subtask, Task, WorkItem};
pub use tracker::{Tracker, TrackerError};
