//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::allocator::DEFAULT_RETRY_LIMIT;
use crate::core::project::Project;
use crate::core::store::DEFAULT_BUSY_TIMEOUT;

/// Bestiary configuration with layered hierarchy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog database file, relative to the project root unless absolute
    pub database: Option<PathBuf>,

    /// Log filter used when neither RUST_LOG nor --verbose is given
    pub log_level: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// How long to wait on a locked database, in milliseconds
    pub busy_timeout_ms: Option<u64>,

    /// Fresh ids tried before an insert gives up
    pub id_retry_limit: Option<u32>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/bestiary/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.bestiary/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        config.apply_env(|key| std::env::var(key).ok());

        config
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "bestiary")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        serde_yml::from_str::<Config>(&contents).ok()
    }

    fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(database) = lookup("BESTIARY_DATABASE") {
            self.database = Some(PathBuf::from(database));
        }
        if let Some(level) = lookup("BESTIARY_LOG") {
            self.log_level = Some(level);
        }
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.busy_timeout_ms.is_some() {
            self.busy_timeout_ms = other.busy_timeout_ms;
        }
        if other.id_retry_limit.is_some() {
            self.id_retry_limit = other.id_retry_limit;
        }
    }

    /// Resolve the database file for a project
    pub fn database_path(&self, project: &Project) -> PathBuf {
        match &self.database {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => project.root().join(path),
            None => project.database_path(),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BUSY_TIMEOUT)
    }

    pub fn id_retry_limit(&self) -> u32 {
        self.id_retry_limit.unwrap_or(DEFAULT_RETRY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_merge_prefers_later_layer() {
        let mut config = Config {
            log_level: Some("warn".to_string()),
            busy_timeout_ms: Some(100),
            ..Default::default()
        };
        config.merge(Config {
            log_level: Some("debug".to_string()),
            ..Default::default()
        });
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.busy_timeout_ms, Some(100));
    }

    #[test]
    fn test_env_overrides_files() {
        let mut config = Config {
            database: Some(PathBuf::from("a.db")),
            ..Default::default()
        };
        config.apply_env(|key| match key {
            "BESTIARY_DATABASE" => Some("/tmp/b.db".to_string()),
            _ => None,
        });
        assert_eq!(config.database, Some(PathBuf::from("/tmp/b.db")));
        assert_eq!(config.log_level, None);
    }

    #[test]
    fn test_project_config_is_read() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        std::fs::write(
            project.config_path(),
            "database: data/dex.db\nid_retry_limit: 7\n",
        )
        .unwrap();

        let config = Config::read_file(&project.config_path()).unwrap();
        assert_eq!(config.id_retry_limit(), 7);
        assert_eq!(
            config.database_path(&project),
            project.root().join("data/dex.db")
        );
    }

    #[test]
    fn test_defaults() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let config = Config::default();
        assert_eq!(config.database_path(&project), project.database_path());
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert_eq!(config.id_retry_limit(), 3);
    }
}
