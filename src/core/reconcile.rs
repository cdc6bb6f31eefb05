//! Link reconciliation sweep
//!
//! Mutations apply their mirror and cascade updates as separate commands, so
//! a store failure part way through can leave a link pointing at a deleted
//! entity or a mirrored link with no partner.
//!
//! Mirrored updates are recorded as [`MirrorIntent`]s in the store's outbox
//! before they start. [`resync_plan`] finishes an interrupted one by
//! re-deriving the counterparts from the owner's current document, which
//! honours removals as well as additions. [`check`] then finds whatever is
//! still broken, and [`repair_plan`] turns those findings into
//! [`LinkCommand`]s: dangling ids are pulled and missing reciprocals are
//! restored.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::core::identity::{EntityId, EntityKind};
use crate::core::links::{plan_mirror, LinkCommand, LinkField, MirrorIntent};
use crate::core::store::{document_id, ArrayUpdate, Document, DocumentStore, Filter, StoreResult};

/// A broken link found by [`check`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum LinkIssue {
    /// `field` on the owner holds an id that does not exist
    Dangling {
        owner_id: EntityId,
        field: LinkField,
        target: EntityId,
    },
    /// `field` on the owner holds `target`, but the target does not link back
    Asymmetric {
        owner_id: EntityId,
        field: LinkField,
        target: EntityId,
    },
}

impl LinkIssue {
    pub fn field(&self) -> LinkField {
        match self {
            LinkIssue::Dangling { field, .. } | LinkIssue::Asymmetric { field, .. } => *field,
        }
    }

    pub fn owner(&self) -> (EntityKind, EntityId) {
        match self {
            LinkIssue::Dangling { owner_id, field, .. }
            | LinkIssue::Asymmetric { owner_id, field, .. } => (field.owner(), *owner_id),
        }
    }

    pub fn target(&self) -> (EntityKind, EntityId) {
        match self {
            LinkIssue::Dangling { field, target, .. }
            | LinkIssue::Asymmetric { field, target, .. } => (field.target(), *target),
        }
    }
}

impl fmt::Display for LinkIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (owner_kind, owner_id) = self.owner();
        let (target_kind, target) = self.target();
        match self {
            LinkIssue::Dangling { field, .. } => write!(
                f,
                "{} {} {} -> {} {} (target does not exist)",
                owner_kind, owner_id, field, target_kind, target
            ),
            LinkIssue::Asymmetric { field, .. } => write!(
                f,
                "{} {} {} -> {} {} (missing reciprocal {})",
                owner_kind,
                owner_id,
                field,
                target_kind,
                target,
                field.reciprocal().map(|r| r.as_str()).unwrap_or("link")
            ),
        }
    }
}

/// Result of a sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkReport {
    /// Number of stored links examined
    pub checked: usize,
    pub issues: Vec<LinkIssue>,
    /// Mirrored updates left unfinished in the outbox
    pub interrupted: usize,
}

impl LinkReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.interrupted == 0
    }
}

/// Stored documents of every collection, keyed by id
struct Snapshot {
    collections: HashMap<EntityKind, BTreeMap<EntityId, Document>>,
}

impl Snapshot {
    fn load<S: DocumentStore + ?Sized>(store: &S) -> StoreResult<Self> {
        let mut collections = HashMap::new();
        for kind in EntityKind::all() {
            let mut docs = BTreeMap::new();
            for doc in store.find_all(*kind)? {
                docs.insert(document_id(*kind, &doc)?, doc);
            }
            collections.insert(*kind, docs);
        }
        Ok(Self { collections })
    }

    fn get(&self, kind: EntityKind, id: EntityId) -> Option<&Document> {
        self.collections.get(&kind).and_then(|docs| docs.get(&id))
    }

    fn documents(&self, kind: EntityKind) -> impl Iterator<Item = (&EntityId, &Document)> {
        self.collections.get(&kind).into_iter().flatten()
    }
}

/// Ids held in a link field. Entries that are not ids are skipped.
fn linked_ids(doc: &Document, field: LinkField) -> Vec<EntityId> {
    let Some(items) = doc.get(field.as_str()).and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut seen = BTreeSet::new();
    items
        .iter()
        .filter_map(|item| item.as_str().and_then(|s| s.parse().ok()))
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Scan every link in the store
pub fn check<S: DocumentStore + ?Sized>(store: &S) -> StoreResult<LinkReport> {
    let snapshot = Snapshot::load(store)?;
    let mut report = LinkReport::default();

    for field in LinkField::all() {
        for (owner_id, doc) in snapshot.documents(field.owner()) {
            for target in linked_ids(doc, *field) {
                report.checked += 1;
                let Some(target_doc) = snapshot.get(field.target(), target) else {
                    report.issues.push(LinkIssue::Dangling {
                        owner_id: *owner_id,
                        field: *field,
                        target,
                    });
                    continue;
                };
                if let Some(reciprocal) = field.reciprocal() {
                    if !linked_ids(target_doc, reciprocal).contains(owner_id) {
                        report.issues.push(LinkIssue::Asymmetric {
                            owner_id: *owner_id,
                            field: *field,
                            target,
                        });
                    }
                }
            }
        }
    }

    report.interrupted = store.pending_intents()?.len();
    Ok(report)
}

/// Commands that bring the counterparts of an interrupted mirrored update
/// in line with the owner's current document.
///
/// Counterparts that link back but are no longer listed lose the owner;
/// listed ids that do not link back gain it. An owner that no longer exists
/// plans nothing, since its delete cascade already pulled every reference.
pub fn resync_plan<S: DocumentStore + ?Sized>(
    store: &S,
    intent: &MirrorIntent,
) -> StoreResult<Vec<LinkCommand>> {
    let Some(doc) = store.find_by_id(intent.kind, intent.id)? else {
        return Ok(Vec::new());
    };

    let mut commands = Vec::new();
    for field in &intent.fields {
        let Some(reciprocal) = field.reciprocal() else {
            continue;
        };
        let listed = linked_ids(&doc, *field);
        let mut linking_back = Vec::new();
        for target in store.find_all(field.target())? {
            if linked_ids(&target, reciprocal).contains(&intent.id) {
                linking_back.push(document_id(field.target(), &target)?);
            }
        }
        commands.extend(plan_mirror(*field, intent.id, &linking_back, &listed));
    }
    Ok(commands)
}

/// Commands that fix the given issues: dangling ids are pulled, missing
/// reciprocals are added.
pub fn repair_plan(issues: &[LinkIssue]) -> Vec<LinkCommand> {
    issues
        .iter()
        .filter_map(|issue| match issue {
            LinkIssue::Dangling {
                owner_id,
                field,
                target,
            } => Some(LinkCommand {
                collection: field.owner(),
                filter: Filter::IdIn(vec![*owner_id]),
                update: ArrayUpdate::Pull {
                    field: *field,
                    value: *target,
                },
            }),
            LinkIssue::Asymmetric {
                owner_id,
                field,
                target,
            } => field.reciprocal().map(|reciprocal| LinkCommand {
                collection: field.target(),
                filter: Filter::IdIn(vec![*target]),
                update: ArrayUpdate::AddToSet {
                    field: reciprocal,
                    value: *owner_id,
                },
            }),
        })
        .collect()
}
