//! Bestiary: a creature catalog with enforced relational integrity
//!
//! Creatures, moves, elemental types, and handlers are stored as independent
//! document collections. [`core::Catalog`] is the write path that keeps the
//! links between them consistent: references must exist, names are unique
//! per kind, mirrored links are kept in lockstep, and deletes remove every
//! inbound reference.

pub mod cli;
pub mod core;
pub mod entities;
