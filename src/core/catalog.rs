//! Entity mutation service
//!
//! [`Catalog`] is the only write path that keeps the catalog's relationships
//! consistent. Every mutation follows the same shape:
//!
//! 1. check name uniqueness and reference existence (no writes on failure)
//! 2. write the primary document
//! 3. apply the mirror or cascade [`LinkCommand`]s to counterpart documents
//!
//! Step 3 is a sequence of independently committed, idempotent commands. If
//! the store fails part way, the returned error carries the commands that
//! were not applied so they can be retried with [`Catalog::apply`]. Mirrored
//! updates are also recorded as a [`MirrorIntent`] in the store's outbox
//! until step 3 completes, so [`Catalog::repair_links`] can finish them from
//! another process.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::allocator::IdAllocator;
use crate::core::entity::{Draft, Entity, Patch};
use crate::core::error::{CatalogError, CatalogResult};
use crate::core::identity::{EntityId, EntityKind};
use crate::core::links::{plan_cascade, plan_mirror, LinkCommand, LinkField, MirrorIntent};
use crate::core::reconcile::{self, LinkReport};
use crate::core::store::{DocumentStore, StoreError, StoreExt};
use crate::core::validator::{ensure_unique_name, validate_references, ReferenceCheck};
use crate::entities::{
    Creature, CreaturePatch, ElementalType, ElementalTypePatch, Handler, HandlerPatch, Move,
    MovePatch, NewCreature, NewElementalType, NewHandler, NewMove,
};

/// One write lock per collection
#[derive(Debug, Default)]
struct WriteLocks {
    creatures: Mutex<()>,
    moves: Mutex<()>,
    types: Mutex<()>,
    handlers: Mutex<()>,
}

impl WriteLocks {
    fn lock(&self, kind: EntityKind) -> MutexGuard<'_, ()> {
        let lock = match kind {
            EntityKind::Creature => &self.creatures,
            EntityKind::Move => &self.moves,
            EntityKind::ElementalType => &self.types,
            EntityKind::Handler => &self.handlers,
        };
        // The guarded data is (), so a poisoned lock is still usable
        lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The creature catalog over a document store
pub struct Catalog<S: DocumentStore> {
    store: S,
    allocator: IdAllocator,
    locks: WriteLocks,
}

impl<S: DocumentStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            allocator: IdAllocator::default(),
            locks: WriteLocks::default(),
        }
    }

    /// Set how many fresh ids an insert may try before failing
    pub fn with_id_retry_limit(mut self, limit: u32) -> Self {
        self.allocator = IdAllocator::new(limit);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get_creature(&self, id: EntityId) -> CatalogResult<Option<Creature>> {
        Ok(self.store.get(id)?)
    }

    pub fn list_creatures(&self) -> CatalogResult<Vec<Creature>> {
        Ok(self.store.all()?)
    }

    /// Unlike the other getters, a missing handler is an error
    pub fn get_handler(&self, id: EntityId) -> CatalogResult<Handler> {
        self.store
            .get(id)?
            .ok_or(CatalogError::NotFound {
                kind: EntityKind::Handler,
                id,
            })
    }

    pub fn list_handlers(&self) -> CatalogResult<Vec<Handler>> {
        Ok(self.store.all()?)
    }

    pub fn get_type(&self, id: EntityId) -> CatalogResult<Option<ElementalType>> {
        Ok(self.store.get(id)?)
    }

    pub fn list_types(&self) -> CatalogResult<Vec<ElementalType>> {
        Ok(self.store.all()?)
    }

    pub fn get_move(&self, id: EntityId) -> CatalogResult<Option<Move>> {
        Ok(self.store.get(id)?)
    }

    pub fn list_moves(&self) -> CatalogResult<Vec<Move>> {
        Ok(self.store.all()?)
    }

    // Nested lookups. Ids that no longer resolve are skipped.

    pub fn creature_moves(&self, creature: &Creature) -> CatalogResult<Vec<Move>> {
        Ok(self.store.many(&creature.move_ids)?)
    }

    pub fn creature_types(&self, creature: &Creature) -> CatalogResult<Vec<ElementalType>> {
        Ok(self.store.many(&creature.type_ids)?)
    }

    pub fn creature_handlers(&self, creature: &Creature) -> CatalogResult<Vec<Handler>> {
        Ok(self.store.many(&creature.handler_ids)?)
    }

    pub fn handler_creatures(&self, handler: &Handler) -> CatalogResult<Vec<Creature>> {
        Ok(self.store.many(&handler.creature_ids)?)
    }

    pub fn strong_against(&self, ty: &ElementalType) -> CatalogResult<Vec<ElementalType>> {
        Ok(self.store.many(&ty.strong_against_ids)?)
    }

    pub fn weak_against(&self, ty: &ElementalType) -> CatalogResult<Vec<ElementalType>> {
        Ok(self.store.many(&ty.weak_against_ids)?)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn add_creature(&self, input: NewCreature) -> CatalogResult<Creature> {
        self.create(input)
    }

    pub fn update_creature(&self, id: EntityId, patch: CreaturePatch) -> CatalogResult<Creature> {
        self.modify(id, patch)
    }

    pub fn delete_creature(&self, id: EntityId) -> CatalogResult<String> {
        self.delete_entity(EntityKind::Creature, id)
    }

    pub fn add_move(&self, input: NewMove) -> CatalogResult<Move> {
        self.create(input)
    }

    pub fn update_move(&self, id: EntityId, patch: MovePatch) -> CatalogResult<Move> {
        self.modify(id, patch)
    }

    pub fn delete_move(&self, id: EntityId) -> CatalogResult<String> {
        self.delete_entity(EntityKind::Move, id)
    }

    pub fn add_type(&self, input: NewElementalType) -> CatalogResult<ElementalType> {
        self.create(input)
    }

    pub fn update_type(
        &self,
        id: EntityId,
        patch: ElementalTypePatch,
    ) -> CatalogResult<ElementalType> {
        self.modify(id, patch)
    }

    pub fn delete_type(&self, id: EntityId) -> CatalogResult<String> {
        self.delete_entity(EntityKind::ElementalType, id)
    }

    pub fn add_handler(&self, input: NewHandler) -> CatalogResult<Handler> {
        self.create(input)
    }

    pub fn update_handler(&self, id: EntityId, patch: HandlerPatch) -> CatalogResult<Handler> {
        self.modify(id, patch)
    }

    pub fn delete_handler(&self, id: EntityId) -> CatalogResult<String> {
        self.delete_entity(EntityKind::Handler, id)
    }

    /// Apply link commands in order.
    ///
    /// Returns the number of documents changed. On failure the error's
    /// `pending` list starts with the command that failed.
    pub fn apply(&self, commands: &[LinkCommand]) -> CatalogResult<usize> {
        let mut changed = 0;
        for (index, command) in commands.iter().enumerate() {
            match self
                .store
                .update_many(command.collection, &command.filter, &command.update)
            {
                Ok(count) => {
                    debug!(%command, count, "applied link command");
                    changed += count;
                }
                Err(source) => {
                    let pending = commands[index..].to_vec();
                    warn!(
                        %command,
                        error = %source,
                        pending = pending.len(),
                        "link update failed, leaving commands unapplied"
                    );
                    return Err(CatalogError::StoreUnavailable { source, pending });
                }
            }
        }
        Ok(changed)
    }

    /// Scan every collection for dangling or one-sided links
    pub fn check_links(&self) -> CatalogResult<LinkReport> {
        Ok(reconcile::check(&self.store)?)
    }

    /// Finish interrupted mirrored updates, then repair whatever a scan
    /// still finds.
    ///
    /// The report counts the updates that were finished and lists the
    /// issues that were repaired after them.
    pub fn repair_links(&self) -> CatalogResult<LinkReport> {
        let mut resynced = 0;
        for entry in self.store.pending_intents()? {
            let _guard = self.locks.lock(entry.intent.kind);
            let plan = reconcile::resync_plan(&self.store, &entry.intent)?;
            let changed = self.apply(&plan)?;
            self.store.clear_intent(entry.seq)?;
            debug!(intent = %entry.intent, seq = entry.seq, changed, "finished interrupted update");
            resynced += 1;
        }

        let mut report = self.check_links()?;
        report.interrupted = resynced;
        let plan = reconcile::repair_plan(&report.issues);
        if !plan.is_empty() {
            let changed = self.apply(&plan)?;
            info!(issues = report.issues.len(), changed, "repaired links");
        }
        Ok(report)
    }

    // =========================================================================
    // Shared mutation paths
    // =========================================================================

    fn create<D: Draft>(&self, input: D) -> CatalogResult<D::Output> {
        let kind = <D::Output as Entity>::KIND;
        let draft = input.normalize();
        if draft.name().is_empty() {
            return Err(CatalogError::InvalidField {
                kind,
                field: "name",
                reason: "must not be blank".to_string(),
            });
        }

        let _guard = self.locks.lock(kind);

        ensure_unique_name(&self.store, kind, draft.name(), None)?;
        let links = draft.links();
        let checks: Vec<ReferenceCheck<'_>> = links
            .iter()
            .map(|(field, ids)| ReferenceCheck::for_field(*field, ids))
            .collect();
        validate_references(&self.store, &checks)?;

        let created = self
            .allocator
            .insert_new(&self.store, |id| draft.build(id))?;
        let id = created.id();
        debug!(%kind, %id, name = created.name(), "inserted");

        let commands: Vec<LinkCommand> = links
            .iter()
            .flat_map(|(field, ids)| plan_mirror(*field, id, &[], ids))
            .collect();
        let intent = self
            .begin_mirror(kind, id, links.iter().map(|(field, _)| *field), &commands)
            .map_err(|source| CatalogError::StoreUnavailable {
                source,
                pending: commands.clone(),
            })?;
        self.apply(&commands)?;
        self.finish_mirror(intent);

        info!(%kind, %id, name = created.name(), "added");
        // Self-referencing mirrors may have touched the new document
        Ok(self.store.get(id)?.unwrap_or(created))
    }

    fn modify<P: Patch>(&self, id: EntityId, patch: P) -> CatalogResult<P::Target> {
        let kind = <P::Target as Entity>::KIND;
        let changes = patch.into_changes();

        let _guard = self.locks.lock(kind);

        let current: P::Target = self
            .store
            .get(id)?
            .ok_or(CatalogError::NotFound { kind, id })?;
        if changes.is_empty() {
            return Ok(current);
        }

        if let Some(name) = &changes.name {
            ensure_unique_name(&self.store, kind, name, Some(id))?;
        }
        let checks: Vec<ReferenceCheck<'_>> = changes
            .links
            .iter()
            .map(|(field, ids)| ReferenceCheck::for_field(*field, ids))
            .collect();
        validate_references(&self.store, &checks)?;

        let commands: Vec<LinkCommand> = changes
            .links
            .iter()
            .flat_map(|(field, ids)| plan_mirror(*field, id, current.links(*field), ids))
            .collect();
        let intent = self.begin_mirror(
            kind,
            id,
            changes.links.iter().map(|(field, _)| *field),
            &commands,
        )?;

        let mut fields = changes.fields.clone();
        if let Some(name) = &changes.name {
            fields.insert("name".to_string(), Value::String(name.clone()));
        }
        for (field, ids) in &changes.links {
            let value = serde_json::to_value(ids).map_err(StoreError::from)?;
            fields.insert(field.as_str().to_string(), value);
        }
        if !self.store.set_fields(kind, id, fields)? {
            return Err(CatalogError::NotFound { kind, id });
        }
        debug!(%kind, %id, "primary document updated");

        self.apply(&commands)?;
        self.finish_mirror(intent);

        info!(%kind, %id, "updated");
        self.store
            .get(id)?
            .ok_or(CatalogError::NotFound { kind, id })
    }

    /// Record a mirrored update in the outbox before its commands run.
    ///
    /// Nothing is recorded when there is nothing to mirror.
    fn begin_mirror(
        &self,
        kind: EntityKind,
        id: EntityId,
        fields: impl IntoIterator<Item = LinkField>,
        commands: &[LinkCommand],
    ) -> Result<Option<u64>, StoreError> {
        if commands.is_empty() {
            return Ok(None);
        }
        let Some(intent) = MirrorIntent::for_fields(kind, id, fields) else {
            return Ok(None);
        };
        let seq = self.store.record_intent(&intent)?;
        debug!(%intent, seq, "mirror intent recorded");
        Ok(Some(seq))
    }

    fn finish_mirror(&self, seq: Option<u64>) {
        let Some(seq) = seq else {
            return;
        };
        // A leftover intent only costs a no-op replay
        if let Err(error) = self.store.clear_intent(seq) {
            warn!(seq, %error, "could not clear mirror intent");
        }
    }

    fn delete_entity(&self, kind: EntityKind, id: EntityId) -> CatalogResult<String> {
        let _guard = self.locks.lock(kind);

        if self.store.find_by_id(kind, id)?.is_none() {
            return Err(CatalogError::NotFound { kind, id });
        }

        let commands = plan_cascade(kind, id);
        let severed = self.apply(&commands)?;
        debug!(%kind, %id, severed, "inbound links removed");

        if !self.store.delete_one(kind, id)? {
            return Err(CatalogError::NotFound { kind, id });
        }

        info!(%kind, %id, "deleted");
        Ok(format!("{} deleted successfully with Id {}", kind, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{
        ArrayUpdate, Document, FieldSet, Filter, MemoryStore, OutboxEntry, StoreResult,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ids(values: &[u64]) -> Vec<EntityId> {
        values.iter().copied().map(EntityId::new).collect()
    }

    fn catalog() -> Catalog<MemoryStore> {
        Catalog::new(MemoryStore::new())
    }

    #[test]
    fn test_handler_scenario() {
        let catalog = catalog();
        let ash = catalog.add_handler(NewHandler::new("Ash")).unwrap();
        let pikachu = catalog.add_creature(NewCreature::new("Pikachu")).unwrap();
        assert_eq!(ash.id, EntityId::new(1));
        assert_eq!(pikachu.id, EntityId::new(1));

        let ash = catalog
            .update_handler(
                ash.id,
                HandlerPatch {
                    creature_ids: Some(vec![pikachu.id]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(ash.creature_ids, vec![pikachu.id]);
        let pikachu = catalog.get_creature(pikachu.id).unwrap().unwrap();
        assert_eq!(pikachu.handler_ids, vec![ash.id]);

        let message = catalog.delete_handler(ash.id).unwrap();
        assert_eq!(message, "Handler deleted successfully with Id 1");
        let pikachu = catalog.get_creature(pikachu.id).unwrap().unwrap();
        assert!(pikachu.handler_ids.is_empty());
    }

    #[test]
    fn test_add_creature_mirrors_handlers() {
        let catalog = catalog();
        let ash = catalog.add_handler(NewHandler::new("Ash")).unwrap();
        let misty = catalog.add_handler(NewHandler::new("Misty")).unwrap();

        let psyduck = catalog
            .add_creature(NewCreature::new("Psyduck").with_handlers(vec![ash.id, misty.id]))
            .unwrap();

        for handler in [ash.id, misty.id] {
            assert_eq!(catalog.get_handler(handler).unwrap().creature_ids, vec![psyduck.id]);
        }
        let handlers = catalog.creature_handlers(&psyduck).unwrap();
        assert_eq!(handlers.len(), 2);
    }

    #[test]
    fn test_update_creature_moves_between_handlers() {
        let catalog = catalog();
        let ash = catalog.add_handler(NewHandler::new("Ash")).unwrap();
        let brock = catalog.add_handler(NewHandler::new("Brock")).unwrap();
        let onix = catalog
            .add_creature(NewCreature::new("Onix").with_handlers(vec![ash.id]))
            .unwrap();

        catalog
            .update_creature(
                onix.id,
                CreaturePatch {
                    handler_ids: Some(vec![brock.id]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(catalog.get_handler(ash.id).unwrap().creature_ids.is_empty());
        assert_eq!(catalog.get_handler(brock.id).unwrap().creature_ids, vec![onix.id]);
    }

    #[test]
    fn test_strong_weak_inverse() {
        let catalog = catalog();
        let fire = catalog.add_type(NewElementalType::new("Fire")).unwrap();
        let grass = catalog.add_type(NewElementalType::new("Grass")).unwrap();
        let water = catalog
            .add_type(
                NewElementalType::new("Water")
                    .strong_against(vec![fire.id])
                    .weak_against(vec![grass.id]),
            )
            .unwrap();

        let fire = catalog.get_type(fire.id).unwrap().unwrap();
        let grass = catalog.get_type(grass.id).unwrap().unwrap();
        assert_eq!(fire.weak_against_ids, vec![water.id]);
        assert_eq!(grass.strong_against_ids, vec![water.id]);
        assert_eq!(catalog.weak_against(&fire).unwrap()[0].name, "Water");

        catalog
            .update_type(
                water.id,
                ElementalTypePatch {
                    strong_against_ids: Some(vec![]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(catalog.get_type(fire.id).unwrap().unwrap().weak_against_ids.is_empty());
        // Untouched field keeps its mirror
        assert_eq!(
            catalog.get_type(grass.id).unwrap().unwrap().strong_against_ids,
            vec![water.id]
        );
    }

    #[test]
    fn test_type_may_reference_itself() {
        let catalog = catalog();
        let dragon = catalog.add_type(NewElementalType::new("Dragon")).unwrap();
        let dragon = catalog
            .update_type(
                dragon.id,
                ElementalTypePatch {
                    strong_against_ids: Some(vec![dragon.id]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(dragon.strong_against_ids, vec![dragon.id]);
        assert_eq!(dragon.weak_against_ids, vec![dragon.id]);
        assert!(catalog.check_links().unwrap().is_clean());
    }

    #[test]
    fn test_delete_cascades_everywhere() {
        let catalog = catalog();
        let thunderbolt = catalog.add_move(NewMove::new("Thunderbolt")).unwrap();
        let electric = catalog.add_type(NewElementalType::new("Electric")).unwrap();
        let ground = catalog
            .add_type(NewElementalType::new("Ground").strong_against(vec![electric.id]))
            .unwrap();
        let ash = catalog.add_handler(NewHandler::new("Ash")).unwrap();
        let pikachu = catalog
            .add_creature(
                NewCreature::new("Pikachu")
                    .with_moves(vec![thunderbolt.id])
                    .with_types(vec![electric.id])
                    .with_handlers(vec![ash.id]),
            )
            .unwrap();

        catalog.delete_move(thunderbolt.id).unwrap();
        catalog.delete_type(electric.id).unwrap();
        let pikachu = catalog.get_creature(pikachu.id).unwrap().unwrap();
        assert!(pikachu.move_ids.is_empty());
        assert!(pikachu.type_ids.is_empty());
        let ground = catalog.get_type(ground.id).unwrap().unwrap();
        assert!(ground.strong_against_ids.is_empty());

        assert_eq!(
            catalog.delete_creature(pikachu.id).unwrap(),
            "Creature deleted successfully with Id 1"
        );
        assert!(catalog.get_handler(ash.id).unwrap().creature_ids.is_empty());
        assert!(catalog.check_links().unwrap().is_clean());
    }

    #[test]
    fn test_invalid_reference_writes_nothing() {
        let catalog = catalog();
        let tackle = catalog.add_move(NewMove::new("Tackle")).unwrap();
        let ash = catalog.add_handler(NewHandler::new("Ash")).unwrap();

        let err = catalog
            .add_creature(
                NewCreature::new("Eevee")
                    .with_moves(vec![tackle.id, EntityId::new(4)])
                    .with_handlers(vec![ash.id]),
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid IDs detected: Moves: 4; Types: None; Handlers: None"
        );
        assert!(catalog.list_creatures().unwrap().is_empty());
        assert!(catalog.get_handler(ash.id).unwrap().creature_ids.is_empty());

        // Partial updates only report the categories they touch
        let eevee = catalog.add_creature(NewCreature::new("Eevee")).unwrap();
        let err = catalog
            .update_creature(
                eevee.id,
                CreaturePatch {
                    name: Some("Vaporeon".to_string()),
                    type_ids: Some(ids(&[8])),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid IDs detected: Types: 8");
        assert_eq!(catalog.get_creature(eevee.id).unwrap().unwrap().name, "Eevee");
    }

    #[test]
    fn test_names_are_unique_ignoring_case() {
        let catalog = catalog();
        catalog.add_move(NewMove::new("Thunderbolt")).unwrap();
        let err = catalog.add_move(NewMove::new("thunderbolt")).unwrap_err();
        assert_eq!(err.to_string(), "Move with name thunderbolt already exists");
        assert_eq!(catalog.list_moves().unwrap().len(), 1);

        // Same name in another collection is fine
        catalog.add_handler(NewHandler::new("Thunderbolt")).unwrap();
    }

    #[test]
    fn test_rename_checks_uniqueness() {
        let catalog = catalog();
        let ash = catalog.add_handler(NewHandler::new("Ash")).unwrap();
        catalog.add_handler(NewHandler::new("Misty")).unwrap();

        let err = catalog
            .update_handler(
                ash.id,
                HandlerPatch {
                    name: Some("MISTY".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName { .. }));

        let ash = catalog
            .update_handler(
                ash.id,
                HandlerPatch {
                    name: Some("ASH".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(ash.name, "ASH");
    }

    #[test]
    fn test_blank_name_rejected_on_add_ignored_on_update() {
        let catalog = catalog();
        let err = catalog.add_creature(NewCreature::new("   ")).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidField { field: "name", .. }));

        let mew = catalog
            .add_creature(NewCreature::new("Mew").with_image("mew.png"))
            .unwrap();
        let mew = catalog
            .update_creature(
                mew.id,
                CreaturePatch {
                    name: Some(String::new()),
                    image: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(mew.name, "Mew");
        assert_eq!(mew.image.as_deref(), Some("mew.png"));
    }

    #[test]
    fn test_update_move_stats() {
        let catalog = catalog();
        let surf = catalog
            .add_move(NewMove::new("Surf").with_power(90).with_accuracy(1.0))
            .unwrap();
        let surf = catalog
            .update_move(
                surf.id,
                MovePatch {
                    power: Some(95),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(surf.power, Some(95));
        assert_eq!(surf.accuracy, Some(1.0));
    }

    #[test]
    fn test_missing_targets_are_not_found() {
        let catalog = catalog();
        let missing = EntityId::new(42);
        assert!(catalog.get_creature(missing).unwrap().is_none());
        assert!(matches!(
            catalog.get_handler(missing),
            Err(CatalogError::NotFound { .. })
        ));
        assert!(matches!(
            catalog.update_move(missing, MovePatch::default()),
            Err(CatalogError::NotFound { .. })
        ));
        let err = catalog.delete_type(missing).unwrap_err();
        assert_eq!(err.to_string(), "Type with ID 42 not found");
    }

    #[test]
    fn test_ids_continue_after_max_and_are_not_reused() {
        let catalog = catalog();
        for name in ["A", "B", "C", "D", "E", "F", "G"] {
            catalog.add_move(NewMove::new(name)).unwrap();
        }
        let h = catalog.add_move(NewMove::new("H")).unwrap();
        assert_eq!(h.id, EntityId::new(8));

        catalog.delete_move(h.id).unwrap();
        let i = catalog.add_move(NewMove::new("I")).unwrap();
        assert_eq!(i.id, EntityId::new(9));
    }

    #[test]
    fn test_concurrent_adds_get_distinct_ids() {
        let catalog = catalog();
        std::thread::scope(|scope| {
            for t in 0..8 {
                let catalog = &catalog;
                scope.spawn(move || {
                    for i in 0..10 {
                        catalog
                            .add_move(NewMove::new(format!("move-{t}-{i}")))
                            .unwrap();
                    }
                });
            }
        });

        let moves = catalog.list_moves().unwrap();
        assert_eq!(moves.len(), 80);
        let mut seen: Vec<EntityId> = moves.iter().map(|m| m.id).collect();
        seen.dedup();
        assert_eq!(seen.len(), 80);
    }

    #[test]
    fn test_concurrent_duplicate_names_admit_one() {
        let catalog = catalog();
        let results: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..6)
                .map(|_| {
                    let catalog = &catalog;
                    scope.spawn(move || catalog.add_handler(NewHandler::new("Gary")).is_ok())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results.iter().filter(|ok| **ok).count(), 1);
    }

    /// Memory store whose bulk updates fail after a set number of calls
    struct FlakyStore {
        inner: MemoryStore,
        updates_left: AtomicUsize,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                updates_left: AtomicUsize::new(usize::MAX),
            }
        }

        fn fail_after(&self, updates: usize) {
            self.updates_left.store(updates, Ordering::SeqCst);
        }

        fn heal(&self) {
            self.updates_left.store(usize::MAX, Ordering::SeqCst);
        }
    }

    impl DocumentStore for FlakyStore {
        fn find_by_id(&self, kind: EntityKind, id: EntityId) -> StoreResult<Option<Document>> {
            self.inner.find_by_id(kind, id)
        }
        fn find_all(&self, kind: EntityKind) -> StoreResult<Vec<Document>> {
            self.inner.find_all(kind)
        }
        fn find_one_by_name(&self, kind: EntityKind, name: &str) -> StoreResult<Option<Document>> {
            self.inner.find_one_by_name(kind, name)
        }
        fn find_max_id(&self, kind: EntityKind) -> StoreResult<Option<EntityId>> {
            self.inner.find_max_id(kind)
        }
        fn next_sequence(&self, kind: EntityKind) -> StoreResult<EntityId> {
            self.inner.next_sequence(kind)
        }
        fn insert_one(&self, kind: EntityKind, doc: Document) -> StoreResult<()> {
            self.inner.insert_one(kind, doc)
        }
        fn set_fields(&self, kind: EntityKind, id: EntityId, fields: FieldSet) -> StoreResult<bool> {
            self.inner.set_fields(kind, id, fields)
        }
        fn delete_one(&self, kind: EntityKind, id: EntityId) -> StoreResult<bool> {
            self.inner.delete_one(kind, id)
        }
        fn update_many(
            &self,
            kind: EntityKind,
            filter: &Filter,
            update: &ArrayUpdate,
        ) -> StoreResult<usize> {
            let left = self.updates_left.load(Ordering::SeqCst);
            if left == 0 {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
            self.updates_left.store(left - 1, Ordering::SeqCst);
            self.inner.update_many(kind, filter, update)
        }
        fn record_intent(&self, intent: &MirrorIntent) -> StoreResult<u64> {
            self.inner.record_intent(intent)
        }
        fn clear_intent(&self, seq: u64) -> StoreResult<()> {
            self.inner.clear_intent(seq)
        }
        fn pending_intents(&self) -> StoreResult<Vec<OutboxEntry>> {
            self.inner.pending_intents()
        }
    }

    #[test]
    fn test_pending_commands_complete_the_graph() {
        let catalog = Catalog::new(FlakyStore::new());
        let fire = catalog.add_type(NewElementalType::new("Fire")).unwrap();
        let grass = catalog.add_type(NewElementalType::new("Grass")).unwrap();
        let water = catalog.add_type(NewElementalType::new("Water")).unwrap();

        catalog.store().fail_after(1);
        let err = catalog
            .update_type(
                water.id,
                ElementalTypePatch {
                    strong_against_ids: Some(vec![fire.id]),
                    weak_against_ids: Some(vec![grass.id]),
                    ..Default::default()
                },
            )
            .unwrap_err();
        let pending = err.pending().to_vec();
        assert_eq!(pending.len(), 1);
        assert_eq!(
            pending[0].update,
            ArrayUpdate::AddToSet {
                field: LinkField::StrongAgainstIds,
                value: water.id,
            }
        );
        assert!(!catalog.check_links().unwrap().is_clean());

        catalog.store().heal();
        catalog.apply(&pending).unwrap();
        let report = catalog.check_links().unwrap();
        assert!(report.issues.is_empty());
        assert_eq!(report.interrupted, 1);
        assert_eq!(
            catalog.get_type(grass.id).unwrap().unwrap().strong_against_ids,
            vec![water.id]
        );

        // Replaying the finished update changes nothing but clears it
        let report = catalog.repair_links().unwrap();
        assert_eq!(report.interrupted, 1);
        assert!(report.issues.is_empty());
        assert!(catalog.check_links().unwrap().is_clean());
    }

    #[test]
    fn test_failed_cascade_keeps_document_for_retry() {
        let catalog = Catalog::new(FlakyStore::new());
        let ash = catalog.add_handler(NewHandler::new("Ash")).unwrap();
        catalog
            .add_creature(NewCreature::new("Pikachu").with_handlers(vec![ash.id]))
            .unwrap();

        catalog.store().fail_after(0);
        let err = catalog.delete_handler(ash.id).unwrap_err();
        assert_eq!(err.pending().len(), 1);
        assert!(catalog.get_handler(ash.id).is_ok());

        catalog.store().heal();
        catalog.delete_handler(ash.id).unwrap();
        assert!(catalog.check_links().unwrap().is_clean());
    }

    #[test]
    fn test_repair_links_fixes_partial_failure() {
        let catalog = Catalog::new(FlakyStore::new());
        let ash = catalog.add_handler(NewHandler::new("Ash")).unwrap();

        catalog.store().fail_after(0);
        let err = catalog
            .add_creature(NewCreature::new("Pikachu").with_handlers(vec![ash.id]))
            .unwrap_err();
        assert!(matches!(err, CatalogError::StoreUnavailable { .. }));

        catalog.store().heal();
        let report = catalog.repair_links().unwrap();
        assert_eq!(report.interrupted, 1);
        assert!(report.issues.is_empty());
        assert_eq!(catalog.get_handler(ash.id).unwrap().creature_ids, ids(&[1]));
        assert!(catalog.check_links().unwrap().is_clean());
    }

    #[test]
    fn test_repair_keeps_interrupted_removal() {
        let catalog = Catalog::new(FlakyStore::new());
        let ash = catalog.add_handler(NewHandler::new("Ash")).unwrap();
        let pikachu = catalog
            .add_creature(NewCreature::new("Pikachu").with_handlers(vec![ash.id]))
            .unwrap();

        catalog.store().fail_after(0);
        catalog
            .update_handler(
                ash.id,
                HandlerPatch {
                    creature_ids: Some(vec![]),
                    ..Default::default()
                },
            )
            .unwrap_err();
        catalog.store().heal();
        assert_eq!(catalog.check_links().unwrap().interrupted, 1);

        let report = catalog.repair_links().unwrap();
        assert_eq!(report.interrupted, 1);
        assert!(report.issues.is_empty());
        assert!(catalog.get_handler(ash.id).unwrap().creature_ids.is_empty());
        let pikachu = catalog.get_creature(pikachu.id).unwrap().unwrap();
        assert!(pikachu.handler_ids.is_empty());
        assert!(catalog.check_links().unwrap().is_clean());
    }

    #[test]
    fn test_stale_intent_does_not_undo_later_update() {
        let catalog = Catalog::new(FlakyStore::new());
        let ash = catalog.add_handler(NewHandler::new("Ash")).unwrap();
        let pikachu = catalog.add_creature(NewCreature::new("Pikachu")).unwrap();
        let link = |creature_ids: Vec<EntityId>| HandlerPatch {
            creature_ids: Some(creature_ids),
            ..Default::default()
        };

        catalog.store().fail_after(0);
        catalog.update_handler(ash.id, link(vec![pikachu.id])).unwrap_err();
        catalog.store().heal();
        catalog.update_handler(ash.id, link(vec![])).unwrap();

        let report = catalog.repair_links().unwrap();
        assert_eq!(report.interrupted, 1);
        assert!(catalog.get_handler(ash.id).unwrap().creature_ids.is_empty());
        assert!(catalog.get_creature(pikachu.id).unwrap().unwrap().handler_ids.is_empty());
        assert!(catalog.check_links().unwrap().is_clean());
    }

    #[test]
    fn test_completed_mutations_leave_no_intents() {
        let catalog = catalog();
        let ash = catalog.add_handler(NewHandler::new("Ash")).unwrap();
        let pikachu = catalog
            .add_creature(NewCreature::new("Pikachu").with_handlers(vec![ash.id]))
            .unwrap();
        catalog
            .update_creature(
                pikachu.id,
                CreaturePatch {
                    handler_ids: Some(vec![]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(catalog.store().pending_intents().unwrap().is_empty());
    }
}
