//! Core module - identity, links, storage, and the catalog service

pub mod allocator;
pub mod catalog;
pub mod config;
pub mod entity;
pub mod error;
pub mod identity;
pub mod links;
pub mod project;
pub mod reconcile;
pub mod store;
pub mod validator;

pub use allocator::IdAllocator;
pub use catalog::Catalog;
pub use config::Config;
pub use entity::{Changes, Draft, Entity, Patch};
pub use error::{CatalogError, CatalogResult, InvalidReferences};
pub use identity::{EntityId, EntityKind, IdList, IdParseError};
pub use links::{LinkCommand, LinkField, MirrorIntent};
pub use project::{Project, ProjectError};
pub use reconcile::{LinkIssue, LinkReport};
pub use store::{DocumentStore, MemoryStore, OutboxEntry, SqliteStore, StoreError, StoreExt};
