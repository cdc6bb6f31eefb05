//! Move entity - an attack a creature can learn

use serde::{Deserialize, Serialize};

use crate::core::entity::{non_blank, Changes, Draft, Entity, Patch};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::links::LinkField;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub id: EntityId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<i64>,

    /// Hit probability, 0.0 to 1.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl Entity for Move {
    const KIND: EntityKind = EntityKind::Move;

    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn links(&self, _field: LinkField) -> &[EntityId] {
        &[]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMove {
    pub name: String,
    #[serde(default)]
    pub power: Option<i64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl NewMove {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_power(mut self, power: i64) -> Self {
        self.power = Some(power);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }
}

impl Draft for NewMove {
    type Output = Move;

    fn normalize(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            ..self
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn links(&self) -> Vec<(LinkField, &[EntityId])> {
        Vec::new()
    }

    fn build(&self, id: EntityId) -> Move {
        Move {
            id,
            name: self.name.clone(),
            power: self.power,
            accuracy: self.accuracy,
        }
    }
}

/// Partial update for `update_move`; `power` and `accuracy` are only
/// overwritten when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub power: Option<i64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl Patch for MovePatch {
    type Target = Move;

    fn into_changes(self) -> Changes {
        let mut changes = Changes {
            name: non_blank(self.name),
            ..Default::default()
        };
        changes.set("power", self.power);
        changes.set("accuracy", self.accuracy);
        changes
    }
}
