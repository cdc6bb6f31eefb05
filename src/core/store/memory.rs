//! In-process document store

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::{
    document_id, document_name, name_key, ArrayUpdate, Document, DocumentStore, FieldSet, Filter,
    OutboxEntry, StoreError, StoreResult,
};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::links::MirrorIntent;

/// A thread-safe store holding every collection in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

#[derive(Debug, Default)]
struct Collections {
    documents: HashMap<EntityKind, BTreeMap<EntityId, Document>>,
    sequences: HashMap<EntityKind, EntityId>,
    outbox: BTreeMap<u64, MirrorIntent>,
    last_outbox_seq: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Collections>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl Collections {
    fn collection(&self, kind: EntityKind) -> Option<&BTreeMap<EntityId, Document>> {
        self.documents.get(&kind)
    }

    fn collection_mut(&mut self, kind: EntityKind) -> &mut BTreeMap<EntityId, Document> {
        self.documents.entry(kind).or_default()
    }
}

impl DocumentStore for MemoryStore {
    fn find_by_id(&self, kind: EntityKind, id: EntityId) -> StoreResult<Option<Document>> {
        let inner = self.lock()?;
        Ok(inner.collection(kind).and_then(|docs| docs.get(&id)).cloned())
    }

    fn find_all(&self, kind: EntityKind) -> StoreResult<Vec<Document>> {
        let inner = self.lock()?;
        Ok(inner
            .collection(kind)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    fn find_many(&self, kind: EntityKind, ids: &[EntityId]) -> StoreResult<Vec<Document>> {
        let inner = self.lock()?;
        let Some(docs) = inner.collection(kind) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    fn find_one_by_name(&self, kind: EntityKind, name: &str) -> StoreResult<Option<Document>> {
        let wanted = name_key(name);
        let inner = self.lock()?;
        Ok(inner.collection(kind).and_then(|docs| {
            docs.values()
                .find(|doc| document_name(doc).map(name_key).as_deref() == Some(wanted.as_str()))
                .cloned()
        }))
    }

    fn find_max_id(&self, kind: EntityKind) -> StoreResult<Option<EntityId>> {
        let inner = self.lock()?;
        Ok(inner
            .collection(kind)
            .and_then(|docs| docs.keys().next_back().copied()))
    }

    fn next_sequence(&self, kind: EntityKind) -> StoreResult<EntityId> {
        let mut inner = self.lock()?;
        let stored_max = inner
            .collection(kind)
            .and_then(|docs| docs.keys().next_back().copied());
        let last_drawn = inner.sequences.get(&kind).copied();
        let next = match stored_max.max(last_drawn) {
            Some(id) => id.next(),
            None => EntityId::FIRST,
        };
        inner.sequences.insert(kind, next);
        Ok(next)
    }

    fn insert_one(&self, kind: EntityKind, doc: Document) -> StoreResult<()> {
        let id = document_id(kind, &doc)?;
        let mut inner = self.lock()?;
        let docs = inner.collection_mut(kind);
        if docs.contains_key(&id) {
            return Err(StoreError::DuplicateKey { kind, id });
        }
        docs.insert(id, doc);
        Ok(())
    }

    fn set_fields(&self, kind: EntityKind, id: EntityId, fields: FieldSet) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        let Some(doc) = inner.collection_mut(kind).get_mut(&id) else {
            return Ok(false);
        };
        let object = doc.as_object_mut().ok_or_else(|| StoreError::Corrupt {
            kind,
            reason: "document is not an object".to_string(),
        })?;
        object.extend(fields);
        Ok(true)
    }

    fn delete_one(&self, kind: EntityKind, id: EntityId) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        Ok(inner.collection_mut(kind).remove(&id).is_some())
    }

    fn update_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        update: &ArrayUpdate,
    ) -> StoreResult<usize> {
        let mut inner = self.lock()?;
        let mut changed = 0;
        for (id, doc) in inner.collection_mut(kind).iter_mut() {
            if filter.matches(*id, doc) && update.apply(kind, doc)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn record_intent(&self, intent: &MirrorIntent) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        inner.last_outbox_seq += 1;
        let seq = inner.last_outbox_seq;
        inner.outbox.insert(seq, intent.clone());
        Ok(seq)
    }

    fn clear_intent(&self, seq: u64) -> StoreResult<()> {
        self.lock()?.outbox.remove(&seq);
        Ok(())
    }

    fn pending_intents(&self) -> StoreResult<Vec<OutboxEntry>> {
        let inner = self.lock()?;
        Ok(inner
            .outbox
            .iter()
            .map(|(seq, intent)| OutboxEntry {
                seq: *seq,
                intent: intent.clone(),
            })
            .collect())
    }
}
