//! Entity identity: collection kinds and per-kind sequential identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The four catalog collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A catalogued creature
    Creature,
    /// A move a creature can know
    Move,
    /// An elemental type with strengths and weaknesses
    ElementalType,
    /// A handler controlling creatures
    Handler,
}

impl EntityKind {
    /// Collection name used by stores
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Creature => "creatures",
            EntityKind::Move => "moves",
            EntityKind::ElementalType => "types",
            EntityKind::Handler => "handlers",
        }
    }

    /// Human-readable singular label, used in messages
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Creature => "Creature",
            EntityKind::Move => "Move",
            EntityKind::ElementalType => "Type",
            EntityKind::Handler => "Handler",
        }
    }

    /// Get all kinds
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Creature,
            EntityKind::Move,
            EntityKind::ElementalType,
            EntityKind::Handler,
        ]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for EntityKind {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "creature" | "creatures" => Ok(EntityKind::Creature),
            "move" | "moves" => Ok(EntityKind::Move),
            "type" | "types" | "elemental_type" => Ok(EntityKind::ElementalType),
            "handler" | "handlers" => Ok(EntityKind::Handler),
            _ => Err(IdParseError::InvalidKind(s.to_string())),
        }
    }
}

/// A per-kind sequential identifier.
///
/// Rendered and serialized as a decimal string (`"7"`); ordered numerically,
/// so `"10"` sorts after `"9"`. Identifiers are only unique within a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

impl EntityId {
    /// The identifier handed out for the first entity of a kind
    pub const FIRST: EntityId = EntityId(1);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The identifier following this one
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Parse an EntityId from a string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(IdParseError::NotNumeric(s.to_string()));
        }
        let value: u64 = trimmed
            .parse()
            .map_err(|_| IdParseError::NotNumeric(s.to_string()))?;
        if value == 0 {
            return Err(IdParseError::Zero);
        }
        Ok(Self(value))
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A comma-separated list of ids as given on the command line.
///
/// An empty string parses to an empty list, which callers treat as an
/// explicit replacement rather than "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdList(pub Vec<EntityId>);

impl IdList {
    pub fn into_vec(self) -> Vec<EntityId> {
        self.0
    }
}

impl FromStr for IdList {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(EntityId::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(IdList)
    }
}

/// Errors that can occur when parsing identifiers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("invalid entity kind: '{0}' (valid: creature, move, type, handler)")]
    InvalidKind(String),

    #[error("invalid id '{0}': ids are positive decimal numbers")]
    NotNumeric(String),

    #[error("invalid id '0': ids start at 1")]
    Zero,
}
