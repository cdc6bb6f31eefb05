//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project marker directory
pub const PROJECT_DIR: &str = ".bestiary";

/// Represents a bestiary project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .bestiary/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::init_force(&root)
    }

    /// Initialize even if .bestiary/ exists. The config file is rewritten;
    /// an existing database is left alone.
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        let project = Self { root };
        std::fs::create_dir_all(project.bestiary_dir())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(project.config_path(), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(project)
    }

    fn default_config() -> &'static str {
        r#"# Bestiary Project Configuration

# Catalog database, relative to the project root (default: .bestiary/catalog.db)
# database: .bestiary/catalog.db

# Log filter when RUST_LOG and --verbose are not given (error, warn, info, debug, trace)
# log_level: warn

# Default output format (auto, yaml, json, tsv, csv, md, id)
# default_format: auto

# Milliseconds to wait for a locked database
# busy_timeout_ms: 5000

# Fresh ids tried when an insert collides with an existing id
# id_retry_limit: 3
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .bestiary directory
    pub fn bestiary_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.bestiary_dir().join("config.yaml")
    }

    /// Default location of the catalog database
    pub fn database_path(&self) -> PathBuf {
        self.bestiary_dir().join("catalog.db")
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a bestiary project (searched from {searched_from:?}). Run 'bestiary init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("bestiary project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
