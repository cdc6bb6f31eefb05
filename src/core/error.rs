//! Catalog error types

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

use crate::core::identity::{EntityId, EntityKind};
use crate::core::links::LinkCommand;
use crate::core::store::StoreError;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors returned by catalog operations
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("{kind} with ID {id} not found")]
    #[diagnostic(code(bestiary::not_found))]
    NotFound { kind: EntityKind, id: EntityId },

    #[error("{kind} with name {name} already exists")]
    #[diagnostic(
        code(bestiary::duplicate_name),
        help("names are compared case-insensitively within each collection")
    )]
    DuplicateName { kind: EntityKind, name: String },

    #[error("{0}")]
    #[diagnostic(code(bestiary::invalid_reference))]
    InvalidReference(InvalidReferences),

    #[error("invalid {field} for {kind}: {reason}")]
    #[diagnostic(code(bestiary::invalid_field))]
    InvalidField {
        kind: EntityKind,
        field: &'static str,
        reason: String,
    },

    #[error("{source}")]
    #[diagnostic(
        code(bestiary::store_unavailable),
        help("run `bestiary link check --fix` to finish interrupted link updates")
    )]
    StoreUnavailable {
        #[source]
        source: StoreError,
        /// Link commands that were not applied when the store failed
        pending: Vec<LinkCommand>,
    },
}

impl CatalogError {
    /// Link commands left unapplied by a failed mutation
    pub fn pending(&self) -> &[LinkCommand] {
        match self {
            CatalogError::StoreUnavailable { pending, .. } => pending,
            _ => &[],
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(source: StoreError) -> Self {
        match source {
            StoreError::DuplicateName { kind, name } => CatalogError::DuplicateName { kind, name },
            source => CatalogError::StoreUnavailable {
                source,
                pending: Vec::new(),
            },
        }
    }
}

/// Foreign ids that failed to resolve, grouped by category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidReferences {
    categories: Vec<(&'static str, Vec<EntityId>)>,
}

impl InvalidReferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a checked category; an empty `missing` list reads as "None"
    pub fn push(&mut self, category: &'static str, missing: Vec<EntityId>) {
        self.categories.push((category, missing));
    }

    /// True if every checked category resolved
    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(|(_, missing)| missing.is_empty())
    }

    /// Missing ids for a category, or an empty slice if it was not checked
    pub fn missing(&self, category: &str) -> &[EntityId] {
        self.categories
            .iter()
            .find(|(name, _)| *name == category)
            .map(|(_, missing)| missing.as_slice())
            .unwrap_or(&[])
    }

    pub fn categories(&self) -> impl Iterator<Item = (&'static str, &[EntityId])> {
        self.categories.iter().map(|(name, ids)| (*name, ids.as_slice()))
    }
}

impl fmt::Display for InvalidReferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid IDs detected: ")?;
        let parts: Vec<String> = self
            .categories
            .iter()
            .map(|(name, missing)| {
                if missing.is_empty() {
                    format!("{}: None", name)
                } else {
                    let ids: Vec<String> = missing.iter().map(ToString::to_string).collect();
                    format!("{}: {}", name, ids.join(", "))
                }
            })
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}
