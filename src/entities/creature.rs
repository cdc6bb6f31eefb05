//! Creature entity - the catalog's central record

use serde::{Deserialize, Serialize};

use crate::core::entity::{dedup_ids, non_blank, Changes, Draft, Entity, Patch};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::links::LinkField;

/// A creature with its moves, elemental types, and handlers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    pub id: EntityId,

    pub name: String,

    /// Image path or URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default)]
    pub move_ids: Vec<EntityId>,

    #[serde(default)]
    pub type_ids: Vec<EntityId>,

    /// Mirrored by [`crate::entities::Handler::creature_ids`]
    #[serde(default)]
    pub handler_ids: Vec<EntityId>,
}

impl Entity for Creature {
    const KIND: EntityKind = EntityKind::Creature;

    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn links(&self, field: LinkField) -> &[EntityId] {
        match field {
            LinkField::MoveIds => &self.move_ids,
            LinkField::TypeIds => &self.type_ids,
            LinkField::HandlerIds => &self.handler_ids,
            _ => &[],
        }
    }
}

/// Input for `add_creature`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCreature {
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub move_ids: Vec<EntityId>,
    #[serde(default)]
    pub type_ids: Vec<EntityId>,
    #[serde(default)]
    pub handler_ids: Vec<EntityId>,
}

impl NewCreature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_moves(mut self, ids: Vec<EntityId>) -> Self {
        self.move_ids = ids;
        self
    }

    pub fn with_types(mut self, ids: Vec<EntityId>) -> Self {
        self.type_ids = ids;
        self
    }

    pub fn with_handlers(mut self, ids: Vec<EntityId>) -> Self {
        self.handler_ids = ids;
        self
    }
}

impl Draft for NewCreature {
    type Output = Creature;

    fn normalize(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            image: non_blank(self.image),
            move_ids: dedup_ids(self.move_ids),
            type_ids: dedup_ids(self.type_ids),
            handler_ids: dedup_ids(self.handler_ids),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn links(&self) -> Vec<(LinkField, &[EntityId])> {
        vec![
            (LinkField::MoveIds, self.move_ids.as_slice()),
            (LinkField::TypeIds, self.type_ids.as_slice()),
            (LinkField::HandlerIds, self.handler_ids.as_slice()),
        ]
    }

    fn build(&self, id: EntityId) -> Creature {
        Creature {
            id,
            name: self.name.clone(),
            image: self.image.clone(),
            move_ids: self.move_ids.clone(),
            type_ids: self.type_ids.clone(),
            handler_ids: self.handler_ids.clone(),
        }
    }
}

/// Partial update for `update_creature`.
///
/// A blank name or image leaves the stored value unchanged. A present but
/// empty list clears the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreaturePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub move_ids: Option<Vec<EntityId>>,
    #[serde(default)]
    pub type_ids: Option<Vec<EntityId>>,
    #[serde(default)]
    pub handler_ids: Option<Vec<EntityId>>,
}

impl Patch for CreaturePatch {
    type Target = Creature;

    fn into_changes(self) -> Changes {
        let mut changes = Changes {
            name: non_blank(self.name),
            ..Default::default()
        };
        changes.set("image", non_blank(self.image));
        changes.link(LinkField::MoveIds, self.move_ids);
        changes.link(LinkField::TypeIds, self.type_ids);
        changes.link(LinkField::HandlerIds, self.handler_ids);
        changes
    }
}
