//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::GlobalOpts;
use crate::core::identity::EntityId;
use crate::core::project::Project;
use crate::core::store::SqliteStore;
use crate::core::{Catalog, Config};

/// Find the project named by `--project`, or the one containing the
/// current directory
pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    let project = match &global.project {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    };
    project.map_err(|e| miette::miette!("{}", e))
}

/// Open the project's catalog with its layered configuration applied
pub fn open_catalog(global: &GlobalOpts) -> Result<(Catalog<SqliteStore>, Config)> {
    let project = open_project(global)?;
    let config = Config::load(Some(&project));
    let path = config.database_path(&project);
    let store = SqliteStore::open_with_timeout(&path, config.busy_timeout())
        .map_err(|e| miette::miette!("cannot open catalog at {}: {}", path.display(), e))?;
    let catalog = Catalog::new(store).with_id_retry_limit(config.id_retry_limit());
    Ok((catalog, config))
}

/// Print a success line unless `--quiet`
pub fn print_success(global: &GlobalOpts, message: impl std::fmt::Display) {
    if !global.quiet {
        println!("{} {}", style("✓").green(), message);
    }
}

/// Write pretty JSON to stdout
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

/// Write YAML to stdout
pub fn print_yaml<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    print!("{}", serde_yml::to_string(value).into_diagnostic()?);
    Ok(())
}

/// Join ids for a table cell; an empty list shows as "-"
pub fn format_ids(ids: &[EntityId]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
