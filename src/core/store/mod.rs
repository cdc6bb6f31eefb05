//! Document store abstraction
//!
//! The catalog keeps four independent collections of JSON documents. A
//! store offers plain single-document reads and writes plus one bulk
//! primitive, [`DocumentStore::update_many`], which performs an idempotent
//! set-add or set-remove on an array field of every matching document.
//! Nothing here knows about cross-collection integrity; that lives in
//! [`crate::core::catalog`].
//!
//! Two backends are provided:
//! - [`MemoryStore`] - in-process, used by tests and embedders
//! - [`SqliteStore`] - on-disk, used by the CLI

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, DEFAULT_BUSY_TIMEOUT};

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityKind};
use crate::core::links::{LinkField, MirrorIntent};

/// A stored document: a JSON object with at least `id` and `name`
pub type Document = Value;

/// Top-level fields to overwrite on a single document
pub type FieldSet = Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("{kind} with ID {id} already exists in the store")]
    DuplicateKey { kind: EntityKind, id: EntityId },

    #[error("{kind} with name {name} already exists")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("corrupt {kind} document: {reason}")]
    Corrupt { kind: EntityKind, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Which documents of a collection a bulk update applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Documents whose id is in the list
    IdIn(Vec<EntityId>),
    /// Documents whose array field contains the id
    Contains(LinkField, EntityId),
}

impl Filter {
    pub fn matches(&self, id: EntityId, doc: &Document) -> bool {
        match self {
            Filter::IdIn(ids) => ids.contains(&id),
            Filter::Contains(field, value) => array_field(doc, *field)
                .map(|items| items.iter().any(|item| is_id(item, *value)))
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::IdIn(ids) => write!(f, "id in [{}]", join_ids(ids)),
            Filter::Contains(field, id) => write!(f, "{} contains {}", field, id),
        }
    }
}

/// An idempotent change to an array field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayUpdate {
    /// Append the value unless already present
    AddToSet { field: LinkField, value: EntityId },
    /// Remove every occurrence of the value
    Pull { field: LinkField, value: EntityId },
}

impl ArrayUpdate {
    pub fn field(&self) -> LinkField {
        match self {
            ArrayUpdate::AddToSet { field, .. } | ArrayUpdate::Pull { field, .. } => *field,
        }
    }

    /// Apply to a document in place. Returns whether the document changed.
    pub fn apply(&self, kind: EntityKind, doc: &mut Document) -> StoreResult<bool> {
        let object = doc.as_object_mut().ok_or_else(|| StoreError::Corrupt {
            kind,
            reason: "document is not an object".to_string(),
        })?;

        let field = self.field();
        match self {
            ArrayUpdate::AddToSet { value, .. } => {
                let slot = object
                    .entry(field.as_str())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if slot.is_null() {
                    *slot = Value::Array(Vec::new());
                }
                let items = slot.as_array_mut().ok_or_else(|| StoreError::Corrupt {
                    kind,
                    reason: format!("field '{}' is not an array", field),
                })?;
                if items.iter().any(|item| is_id(item, *value)) {
                    return Ok(false);
                }
                items.push(Value::String(value.to_string()));
                Ok(true)
            }
            ArrayUpdate::Pull { value, .. } => {
                let Some(items) = object.get_mut(field.as_str()).and_then(Value::as_array_mut)
                else {
                    return Ok(false);
                };
                let before = items.len();
                items.retain(|item| !is_id(item, *value));
                Ok(items.len() != before)
            }
        }
    }
}

impl fmt::Display for ArrayUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayUpdate::AddToSet { field, value } => write!(f, "add {} to {}", value, field),
            ArrayUpdate::Pull { field, value } => write!(f, "pull {} from {}", value, field),
        }
    }
}

/// A [`MirrorIntent`] waiting in the outbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    /// Outbox sequence number, increasing in recording order
    pub seq: u64,
    pub intent: MirrorIntent,
}

/// The document store the catalog runs against.
///
/// Implementations must be safe to share between threads. Every method is an
/// independently committed operation; there is no cross-call transaction.
pub trait DocumentStore: Send + Sync {
    fn find_by_id(&self, kind: EntityKind, id: EntityId) -> StoreResult<Option<Document>>;

    /// All documents of a collection, ordered by id
    fn find_all(&self, kind: EntityKind) -> StoreResult<Vec<Document>>;

    /// Documents whose id is in `ids`, ordered by id. Unknown ids are skipped.
    fn find_many(&self, kind: EntityKind, ids: &[EntityId]) -> StoreResult<Vec<Document>> {
        let wanted: BTreeSet<EntityId> = ids.iter().copied().collect();
        let mut docs = Vec::with_capacity(wanted.len());
        for id in wanted {
            if let Some(doc) = self.find_by_id(kind, id)? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    /// The subset of `ids` that exist in the collection
    fn distinct_ids(&self, kind: EntityKind, ids: &[EntityId]) -> StoreResult<BTreeSet<EntityId>> {
        self.find_many(kind, ids)?
            .iter()
            .map(|doc| document_id(kind, doc))
            .collect()
    }

    /// Case-insensitive exact match on `name`
    fn find_one_by_name(&self, kind: EntityKind, name: &str) -> StoreResult<Option<Document>>;

    /// Highest id currently stored in the collection
    fn find_max_id(&self, kind: EntityKind) -> StoreResult<Option<EntityId>>;

    /// Atomically draw the next id for a collection.
    ///
    /// The result is greater than every id previously drawn and every id
    /// currently stored, so deleted ids are never handed out again.
    fn next_sequence(&self, kind: EntityKind) -> StoreResult<EntityId>;

    /// Insert a new document. Fails with [`StoreError::DuplicateKey`] if the id is taken.
    fn insert_one(&self, kind: EntityKind, doc: Document) -> StoreResult<()>;

    /// Overwrite the given top-level fields of one document, leaving the
    /// others untouched. Returns false if the document does not exist.
    fn set_fields(&self, kind: EntityKind, id: EntityId, fields: FieldSet) -> StoreResult<bool>;

    /// Returns false if the document did not exist
    fn delete_one(&self, kind: EntityKind, id: EntityId) -> StoreResult<bool>;

    /// Apply an array update to every matching document. Returns the number
    /// of documents that changed.
    fn update_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        update: &ArrayUpdate,
    ) -> StoreResult<usize>;

    /// Persist a mirrored update before it starts. Returns its outbox sequence.
    fn record_intent(&self, intent: &MirrorIntent) -> StoreResult<u64>;

    /// Drop a finished intent. Clearing an unknown sequence is not an error.
    fn clear_intent(&self, seq: u64) -> StoreResult<()>;

    /// Intents recorded but never cleared, oldest first
    fn pending_intents(&self) -> StoreResult<Vec<OutboxEntry>>;
}

/// Typed access on top of any [`DocumentStore`]
pub trait StoreExt: DocumentStore {
    fn get<T: Entity>(&self, id: EntityId) -> StoreResult<Option<T>> {
        self.find_by_id(T::KIND, id)?
            .map(|doc| from_document(T::KIND, doc))
            .transpose()
    }

    fn all<T: Entity>(&self) -> StoreResult<Vec<T>> {
        self.find_all(T::KIND)?
            .into_iter()
            .map(|doc| from_document(T::KIND, doc))
            .collect()
    }

    fn many<T: Entity>(&self, ids: &[EntityId]) -> StoreResult<Vec<T>> {
        self.find_many(T::KIND, ids)?
            .into_iter()
            .map(|doc| from_document(T::KIND, doc))
            .collect()
    }

    fn insert<T: Entity>(&self, entity: &T) -> StoreResult<()> {
        self.insert_one(T::KIND, serde_json::to_value(entity)?)
    }
}

impl<S: DocumentStore + ?Sized> StoreExt for S {}

/// Read the `id` of a stored document
pub fn document_id(kind: EntityKind, doc: &Document) -> StoreResult<EntityId> {
    doc.get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Corrupt {
            kind,
            reason: "missing string 'id'".to_string(),
        })?
        .parse()
        .map_err(|e: crate::core::identity::IdParseError| StoreError::Corrupt {
            kind,
            reason: e.to_string(),
        })
}

/// Read the `name` of a stored document
pub fn document_name(doc: &Document) -> Option<&str> {
    doc.get("name").and_then(Value::as_str)
}

/// Key used for case-insensitive name comparison
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

fn from_document<T: Entity>(kind: EntityKind, doc: Document) -> StoreResult<T> {
    serde_json::from_value(doc).map_err(|e| StoreError::Corrupt {
        kind,
        reason: e.to_string(),
    })
}

fn array_field(doc: &Document, field: LinkField) -> Option<&Vec<Value>> {
    doc.get(field.as_str()).and_then(Value::as_array)
}

fn is_id(item: &Value, id: EntityId) -> bool {
    match item {
        Value::String(s) => s.parse::<EntityId>().map(|v| v == id).unwrap_or(false),
        Value::Number(n) => n.as_u64() == Some(id.value()),
        _ => false,
    }
}

fn join_ids(ids: &[EntityId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
