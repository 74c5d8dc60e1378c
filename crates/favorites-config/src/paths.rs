//! File system paths for the favorites service.

use crate::{ConfigError, ConfigResult};
use std::path::PathBuf;

/// Manages file system paths under the base directory (`~/.favorites`).
#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.favorites`.
    pub fn new() -> ConfigResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| ConfigError::Path("Could not determine home directory".to_string()))?;
        Ok(Self {
            base_dir: home.join(".favorites"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// `~/.favorites/config.json`
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// `~/.favorites/favorites.sqlite`
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join("favorites.sqlite")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// `~/.favorites/logs/favorites.jsonl`
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("favorites.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> ConfigResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
