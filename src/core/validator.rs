//! Pre-write checks: reference existence and name uniqueness
//!
//! Both checks are read-only. A caller that gets an error back from either
//! must not have written anything yet.

use tracing::debug;

use crate::core::error::{CatalogError, CatalogResult, InvalidReferences};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::links::LinkField;
use crate::core::store::{document_id, DocumentStore};

/// One list of foreign ids to resolve against a collection
#[derive(Debug, Clone, Copy)]
pub struct ReferenceCheck<'a> {
    pub category: &'static str,
    pub kind: EntityKind,
    pub ids: &'a [EntityId],
}

impl<'a> ReferenceCheck<'a> {
    /// Check the ids proposed for a link field against the field's target collection
    pub fn for_field(field: LinkField, ids: &'a [EntityId]) -> Self {
        Self {
            category: field.category(),
            kind: field.target(),
            ids,
        }
    }
}

/// Ensure every id in every check exists.
///
/// All categories are resolved before failing, so the error lists every
/// unresolved id at once; categories that resolved are reported as "None".
pub fn validate_references<S: DocumentStore + ?Sized>(
    store: &S,
    checks: &[ReferenceCheck<'_>],
) -> CatalogResult<()> {
    let mut report = InvalidReferences::new();

    for check in checks {
        let existing = if check.ids.is_empty() {
            Default::default()
        } else {
            store.distinct_ids(check.kind, check.ids)?
        };
        let mut missing: Vec<EntityId> = Vec::new();
        for id in check.ids {
            if !existing.contains(id) && !missing.contains(id) {
                missing.push(*id);
            }
        }
        debug!(
            category = check.category,
            checked = check.ids.len(),
            missing = missing.len(),
            "resolved references"
        );
        report.push(check.category, missing);
    }

    if report.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::InvalidReference(report))
    }
}

/// Ensure no other entity of `kind` already uses `name`, ignoring case.
///
/// `exempt` names the entity being renamed, which may keep its own name in a
/// different case.
pub fn ensure_unique_name<S: DocumentStore + ?Sized>(
    store: &S,
    kind: EntityKind,
    name: &str,
    exempt: Option<EntityId>,
) -> CatalogResult<()> {
    let Some(existing) = store.find_one_by_name(kind, name)? else {
        return Ok(());
    };
    if exempt.is_some() && Some(document_id(kind, &existing)?) == exempt {
        return Ok(());
    }
    Err(CatalogError::DuplicateName {
        kind,
        name: name.to_string(),
    })
}
