//! Link fields, reciprocal link handling, and link command planning
//!
//! Every relationship in the catalog is an array of foreign ids stored on
//! the owning document. Two of them are mirrored: a creature's handlers and
//! a handler's creatures, and a type's strengths and the weaknesses of the
//! types it is strong against. This module knows which field mirrors which,
//! and turns "this list changed" or "this entity is gone" into a list of
//! [`LinkCommand`]s that a store can apply. Planning is pure; nothing here
//! touches a store.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::identity::{EntityId, EntityKind};
use crate::core::store::{ArrayUpdate, Filter};

/// A relationship field holding foreign ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkField {
    /// Creature -> Move
    MoveIds,
    /// Creature -> ElementalType
    TypeIds,
    /// Creature -> Handler (mirrors `creature_ids`)
    HandlerIds,
    /// Handler -> Creature (mirrors `handler_ids`)
    CreatureIds,
    /// ElementalType -> ElementalType (mirrors `weak_against_ids`)
    StrongAgainstIds,
    /// ElementalType -> ElementalType (mirrors `strong_against_ids`)
    WeakAgainstIds,
}

impl LinkField {
    /// Document field name
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkField::MoveIds => "move_ids",
            LinkField::TypeIds => "type_ids",
            LinkField::HandlerIds => "handler_ids",
            LinkField::CreatureIds => "creature_ids",
            LinkField::StrongAgainstIds => "strong_against_ids",
            LinkField::WeakAgainstIds => "weak_against_ids",
        }
    }

    /// Category label used when reporting unresolved ids in this field
    pub fn category(&self) -> &'static str {
        match self {
            LinkField::MoveIds => "Moves",
            LinkField::TypeIds => "Types",
            LinkField::HandlerIds => "Handlers",
            LinkField::CreatureIds => "Creatures",
            LinkField::StrongAgainstIds => "Strong Types",
            LinkField::WeakAgainstIds => "Weak Types",
        }
    }

    pub fn all() -> &'static [LinkField] {
        &[
            LinkField::MoveIds,
            LinkField::TypeIds,
            LinkField::HandlerIds,
            LinkField::CreatureIds,
            LinkField::StrongAgainstIds,
            LinkField::WeakAgainstIds,
        ]
    }

    /// The kind of document that stores this field
    pub fn owner(&self) -> EntityKind {
        match self {
            LinkField::MoveIds | LinkField::TypeIds | LinkField::HandlerIds => {
                EntityKind::Creature
            }
            LinkField::CreatureIds => EntityKind::Handler,
            LinkField::StrongAgainstIds | LinkField::WeakAgainstIds => EntityKind::ElementalType,
        }
    }

    /// The kind of entity the stored ids refer to
    pub fn target(&self) -> EntityKind {
        match self {
            LinkField::MoveIds => EntityKind::Move,
            LinkField::TypeIds | LinkField::StrongAgainstIds | LinkField::WeakAgainstIds => {
                EntityKind::ElementalType
            }
            LinkField::HandlerIds => EntityKind::Handler,
            LinkField::CreatureIds => EntityKind::Creature,
        }
    }

    /// The field on the target that must link back, if this edge is mirrored.
    ///
    /// # Examples
    /// ```
    /// use bestiary::core::links::LinkField;
    ///
    /// assert_eq!(LinkField::HandlerIds.reciprocal(), Some(LinkField::CreatureIds));
    /// assert_eq!(LinkField::StrongAgainstIds.reciprocal(), Some(LinkField::WeakAgainstIds));
    /// assert_eq!(LinkField::MoveIds.reciprocal(), None);
    /// ```
    pub fn reciprocal(&self) -> Option<LinkField> {
        match self {
            LinkField::HandlerIds => Some(LinkField::CreatureIds),
            LinkField::CreatureIds => Some(LinkField::HandlerIds),
            LinkField::StrongAgainstIds => Some(LinkField::WeakAgainstIds),
            LinkField::WeakAgainstIds => Some(LinkField::StrongAgainstIds),
            LinkField::MoveIds | LinkField::TypeIds => None,
        }
    }

    /// Fields stored on documents of the given kind
    pub fn owned_by(kind: EntityKind) -> impl Iterator<Item = LinkField> {
        Self::all().iter().copied().filter(move |f| f.owner() == kind)
    }

    /// Fields that may hold ids of the given kind
    pub fn targeting(kind: EntityKind) -> impl Iterator<Item = LinkField> {
        Self::all().iter().copied().filter(move |f| f.target() == kind)
    }
}

impl fmt::Display for LinkField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One idempotent set-add or set-remove, applied to every document of a
/// collection matching a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCommand {
    pub collection: EntityKind,
    pub filter: Filter,
    pub update: ArrayUpdate,
}

impl fmt::Display for LinkCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} where {}: {}", self.collection.as_str(), self.filter, self.update)
    }
}

/// A mirrored update in flight: the owner whose mirrored fields are being
/// changed, recorded in the store's outbox until its counterparts agree.
///
/// Replaying an intent re-derives the counterparts from the owner's current
/// document, so a stale intent can never undo a later write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorIntent {
    pub kind: EntityKind,
    pub id: EntityId,
    pub fields: Vec<LinkField>,
}

impl MirrorIntent {
    /// Intent covering the mirrored fields among `fields`, or `None` if
    /// none of them is mirrored
    pub fn for_fields(
        kind: EntityKind,
        id: EntityId,
        fields: impl IntoIterator<Item = LinkField>,
    ) -> Option<Self> {
        let fields: Vec<LinkField> = fields
            .into_iter()
            .filter(|f| f.reciprocal().is_some())
            .collect();
        if fields.is_empty() {
            None
        } else {
            Some(Self { kind, id, fields })
        }
    }
}

impl fmt::Display for MirrorIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fields.iter().map(LinkField::as_str).collect();
        write!(f, "{} {} [{}]", self.kind, self.id, fields.join(", "))
    }
}

/// Plan the counterpart updates for a mirrored field whose value on `owner`
/// changes from `previous` to `next`.
///
/// Ids dropped from the list lose `owner` from their reciprocal field; ids
/// new to the list gain it. Unmirrored fields plan nothing. Existence of the
/// ids is not checked here.
pub fn plan_mirror(
    field: LinkField,
    owner: EntityId,
    previous: &[EntityId],
    next: &[EntityId],
) -> Vec<LinkCommand> {
    let Some(reciprocal) = field.reciprocal() else {
        return Vec::new();
    };

    let before: HashSet<EntityId> = previous.iter().copied().collect();
    let after: HashSet<EntityId> = next.iter().copied().collect();

    let removed: Vec<EntityId> = previous
        .iter()
        .copied()
        .filter(|id| !after.contains(id))
        .collect();
    let added: Vec<EntityId> = next
        .iter()
        .copied()
        .filter(|id| !before.contains(id))
        .collect();

    let mut commands = Vec::new();
    if !removed.is_empty() {
        commands.push(LinkCommand {
            collection: field.target(),
            filter: Filter::IdIn(removed),
            update: ArrayUpdate::Pull {
                field: reciprocal,
                value: owner,
            },
        });
    }
    if !added.is_empty() {
        commands.push(LinkCommand {
            collection: field.target(),
            filter: Filter::IdIn(added),
            update: ArrayUpdate::AddToSet {
                field: reciprocal,
                value: owner,
            },
        });
    }
    commands
}

/// Plan the removal of every inbound reference to a deleted entity.
///
/// One command per field, on any kind, that can hold ids of `kind`.
pub fn plan_cascade(kind: EntityKind, id: EntityId) -> Vec<LinkCommand> {
    LinkField::targeting(kind)
        .map(|field| LinkCommand {
            collection: field.owner(),
            filter: Filter::Contains(field, id),
            update: ArrayUpdate::Pull { field, value: id },
        })
        .collect()
}
