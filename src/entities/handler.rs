//! Handler entity - a person who looks after creatures

use serde::{Deserialize, Serialize};

use crate::core::entity::{dedup_ids, non_blank, Changes, Draft, Entity, Patch};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::links::LinkField;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handler {
    pub id: EntityId,

    pub name: String,

    /// Mirrored by [`crate::entities::Creature::handler_ids`]
    #[serde(default)]
    pub creature_ids: Vec<EntityId>,
}

impl Entity for Handler {
    const KIND: EntityKind = EntityKind::Handler;

    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn links(&self, field: LinkField) -> &[EntityId] {
        match field {
            LinkField::CreatureIds => &self.creature_ids,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewHandler {
    pub name: String,
    #[serde(default)]
    pub creature_ids: Vec<EntityId>,
}

impl NewHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_creatures(mut self, ids: Vec<EntityId>) -> Self {
        self.creature_ids = ids;
        self
    }
}

impl Draft for NewHandler {
    type Output = Handler;

    fn normalize(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            creature_ids: dedup_ids(self.creature_ids),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn links(&self) -> Vec<(LinkField, &[EntityId])> {
        vec![(LinkField::CreatureIds, self.creature_ids.as_slice())]
    }

    fn build(&self, id: EntityId) -> Handler {
        Handler {
            id,
            name: self.name.clone(),
            creature_ids: self.creature_ids.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub creature_ids: Option<Vec<EntityId>>,
}

impl Patch for HandlerPatch {
    type Target = Handler;

    fn into_changes(self) -> Changes {
        let mut changes = Changes {
            name: non_blank(self.name),
            ..Default::default()
        };
        changes.link(LinkField::CreatureIds, self.creature_ids);
        changes
    }
}
