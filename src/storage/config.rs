//! Configuration handling for Tempo
//!
//! Configuration is stored in `.tempo/config.toml` (project) and
//! `~/.config/tempo/config.toml` (global). Project values win.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of entries shown by the history view. The tracker
    /// itself keeps the full history; this bounds the display only.
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { history_limit: 10 }
    }
}

impl Config {
    /// Loads configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Resolves the effective configuration for a project: the project
    /// file if present, otherwise the global file, otherwise defaults.
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let project_path = project_root.join(".tempo").join("config.toml");
        if project_path.exists() {
            return Self::load(&project_path);
        }
        Ok(Self::global().unwrap_or_default())
    }

    fn global() -> Option<Self> {
        let dirs = ProjectDirs::from("", "", "tempo")?;
        let path = dirs.config_dir().join("config.toml");
        if path.exists() {
            Self::load(&path).ok()
        } else {
            None
        }
    }

    /// Walks up from the current directory looking for a `.tempo`
    /// directory
    pub fn find_project_root() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            if dir.join(".tempo").is_dir() {
                return Some(dir);
            }
            if !dir.pop() {
                return None;
            }
        }
    }
}
