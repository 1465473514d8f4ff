//! Project management
//!
//! Handles project initialization and provides access to the tracker
//! store and configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{Config, TrackerStore};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a tempo project. Run 'tempo init' first.")]
    NotInProject,
}

/// A Tempo project: a directory with a `.tempo/` folder holding the
/// tracker file and configuration
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.join(".tempo").is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;
        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;
        Self::open(root)
    }

    /// Initializes a new project at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let tempo_dir = root.join(".tempo");

        fs::create_dir_all(&tempo_dir).with_context(|| {
            format!("Failed to create .tempo directory: {}", tempo_dir.display())
        })?;

        let config_path = tempo_dir.join("config.toml");
        if !config_path.exists() {
            let default_config = r#"# Tempo configuration

# Maximum number of entries shown by 'tempo history'
history_limit = 10
"#;
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .tempo directory path
    pub fn tempo_dir(&self) -> PathBuf {
        self.root.join(".tempo")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the tracker store
    pub fn tracker_store(&self) -> TrackerStore {
        TrackerStore::for_project(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_structure() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.tempo_dir().is_dir());
        assert!(project.tempo_dir().join("config.toml").is_file());
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();

        Project::init(dir.path()).unwrap();
        Project::init(dir.path()).unwrap();

        assert!(dir.path().join(".tempo").is_dir());
    }

    #[test]
    fn open_existing_project() {
        let dir = TempDir::new().unwrap();
        Project::init(dir.path()).unwrap();

        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.root(), dir.path());
    }

    #[test]
    fn open_non_project_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Project::open(dir.path()).is_err());
    }

    #[test]
    fn tracker_store_lives_under_tempo_dir() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.tracker_store().path().ends_with(".tempo/tracker.csv"));
    }
}
