//! Identifier allocation
//!
//! Ids come from the store's atomic per-collection sequence. The insert that
//! consumes an id is still guarded by the store's unique key: if another
//! writer got there first (for example a process writing the same database
//! with an older sequence), a fresh id is drawn and the insert retried.

use tracing::{debug, warn};

use crate::core::entity::Entity;
use crate::core::error::CatalogResult;
use crate::core::identity::EntityId;
use crate::core::store::{DocumentStore, StoreError, StoreExt};

/// Default number of fresh ids tried before giving up on an insert
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

#[derive(Debug, Clone, Copy)]
pub struct IdAllocator {
    retry_limit: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_LIMIT)
    }
}

impl IdAllocator {
    pub fn new(retry_limit: u32) -> Self {
        Self {
            retry_limit: retry_limit.max(1),
        }
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Insert a new entity under a freshly allocated id.
    ///
    /// `build` is called once per attempt with the candidate id.
    pub fn insert_new<S, T, F>(&self, store: &S, build: F) -> CatalogResult<T>
    where
        S: DocumentStore + ?Sized,
        T: Entity,
        F: Fn(EntityId) -> T,
    {
        let mut attempt = 1;
        loop {
            let id = store.next_sequence(T::KIND)?;
            let entity = build(id);
            match store.insert(&entity) {
                Ok(()) => {
                    debug!(kind = %T::KIND, %id, attempt, "allocated id");
                    return Ok(entity);
                }
                Err(StoreError::DuplicateKey { kind, id }) if attempt < self.retry_limit => {
                    warn!(%kind, %id, attempt, "id already taken, drawing another");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
