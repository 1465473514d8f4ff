//! # Storage Layer
//!
//! Persistence for the tracker plus project/config handling.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tracker state | Line-oriented records | `.tempo/tracker.csv` |
//! | Config | TOML | `.tempo/config.toml` |
//!
//! [`FileTracker`] wraps the in-memory tracker and rewrites the full
//! record file after every mutation; writes are atomic (temp file +
//! rename) under an exclusive file lock. [`Project`] is the entry point
//! for locating the `.tempo/` directory of the current project.

mod config;
mod csv;
mod project;

pub use config::{Config, ConfigError};
pub use csv::{parse_local, FileTracker, LoadWarning, PersistenceError, RecordError, TrackerStore};
pub use project::{Project, ProjectError};
