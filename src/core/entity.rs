//! Entity trait - common interface for all catalog entities

use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::{EntityId, EntityKind};
use crate::core::links::LinkField;
use crate::core::store::FieldSet;

/// Common trait for all catalog entities
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// The collection this entity lives in
    const KIND: EntityKind;

    /// Get the entity's identifier
    fn id(&self) -> EntityId;

    /// Get the entity's name
    fn name(&self) -> &str;

    /// Ids currently stored in one of this entity's link fields.
    ///
    /// Returns an empty slice for fields the entity does not own.
    fn links(&self, field: LinkField) -> &[EntityId];
}

/// Input for creating an entity, before an id has been allocated
pub trait Draft {
    type Output: Entity;

    /// Trim the name, drop blank optional text, and collapse duplicate ids
    fn normalize(self) -> Self;

    fn name(&self) -> &str;

    /// Proposed ids for each link field the new entity owns
    fn links(&self) -> Vec<(LinkField, &[EntityId])>;

    /// Build the entity under a candidate id. May be called more than once.
    fn build(&self, id: EntityId) -> Self::Output;
}

/// A partial update: absent fields are left unchanged
pub trait Patch {
    type Target: Entity;

    fn into_changes(self) -> Changes;
}

/// Normalized content of a [`Patch`]
#[derive(Debug, Clone, Default)]
pub struct Changes {
    /// New name, if a non-blank one was supplied
    pub name: Option<String>,
    /// Replacement lists for the link fields that were supplied
    pub links: Vec<(LinkField, Vec<EntityId>)>,
    /// Other top-level fields to overwrite
    pub fields: FieldSet,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.links.is_empty() && self.fields.is_empty()
    }

    /// Record a replacement link list, if one was supplied
    pub fn link(&mut self, field: LinkField, ids: Option<Vec<EntityId>>) {
        if let Some(ids) = ids {
            self.links.push((field, dedup_ids(ids)));
        }
    }

    /// Record a plain field, if a value was supplied
    pub fn set<V: Serialize>(&mut self, field: &str, value: Option<V>) {
        if let Some(value) = value.and_then(|v| serde_json::to_value(v).ok()) {
            self.fields.insert(field.to_string(), value);
        }
    }
}

/// Collapse duplicate ids, keeping the first occurrence of each
pub fn dedup_ids(ids: Vec<EntityId>) -> Vec<EntityId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Normalize an optional free-text field: blank becomes absent
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
