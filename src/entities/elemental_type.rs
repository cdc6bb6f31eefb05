//! Elemental type entity - strengths and weaknesses between types
//!
//! `strong_against_ids` and `weak_against_ids` mirror each other across
//! types: if Water is strong against Fire, Fire is weak against Water. A
//! type may list itself.

use serde::{Deserialize, Serialize};

use crate::core::entity::{dedup_ids, non_blank, Changes, Draft, Entity, Patch};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::links::LinkField;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementalType {
    pub id: EntityId,

    pub name: String,

    #[serde(default)]
    pub strong_against_ids: Vec<EntityId>,

    #[serde(default)]
    pub weak_against_ids: Vec<EntityId>,
}

impl Entity for ElementalType {
    const KIND: EntityKind = EntityKind::ElementalType;

    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn links(&self, field: LinkField) -> &[EntityId] {
        match field {
            LinkField::StrongAgainstIds => &self.strong_against_ids,
            LinkField::WeakAgainstIds => &self.weak_against_ids,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewElementalType {
    pub name: String,
    #[serde(default)]
    pub strong_against_ids: Vec<EntityId>,
    #[serde(default)]
    pub weak_against_ids: Vec<EntityId>,
}

impl NewElementalType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn strong_against(mut self, ids: Vec<EntityId>) -> Self {
        self.strong_against_ids = ids;
        self
    }

    pub fn weak_against(mut self, ids: Vec<EntityId>) -> Self {
        self.weak_against_ids = ids;
        self
    }
}

impl Draft for NewElementalType {
    type Output = ElementalType;

    fn normalize(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            strong_against_ids: dedup_ids(self.strong_against_ids),
            weak_against_ids: dedup_ids(self.weak_against_ids),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn links(&self) -> Vec<(LinkField, &[EntityId])> {
        vec![
            (LinkField::StrongAgainstIds, self.strong_against_ids.as_slice()),
            (LinkField::WeakAgainstIds, self.weak_against_ids.as_slice()),
        ]
    }

    fn build(&self, id: EntityId) -> ElementalType {
        ElementalType {
            id,
            name: self.name.clone(),
            strong_against_ids: self.strong_against_ids.clone(),
            weak_against_ids: self.weak_against_ids.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementalTypePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub strong_against_ids: Option<Vec<EntityId>>,
    #[serde(default)]
    pub weak_against_ids: Option<Vec<EntityId>>,
}

impl Patch for ElementalTypePatch {
    type Target = ElementalType;

    fn into_changes(self) -> Changes {
        let mut changes = Changes {
            name: non_blank(self.name),
            ..Default::default()
        };
        changes.link(LinkField::StrongAgainstIds, self.strong_against_ids);
        changes.link(LinkField::WeakAgainstIds, self.weak_against_ids);
        changes
    }
}
