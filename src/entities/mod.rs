//! Entity type definitions
//!
//! The catalog holds four kinds of entity:
//!
//! - [`Creature`] - links to moves, elemental types, and handlers
//! - [`Move`] - attack with optional power and accuracy
//! - [`ElementalType`] - strengths and weaknesses against other types
//! - [`Handler`] - looks after creatures
//!
//! Each kind comes with a `New*` input for creation and a `*Patch` for
//! partial updates.

pub mod creature;
pub mod elemental_type;
pub mod handler;
pub mod moves;

pub use creature::{Creature, CreaturePatch, NewCreature};
pub use elemental_type::{ElementalType, ElementalTypePatch, NewElementalType};
pub use handler::{Handler, HandlerPatch, NewHandler};
pub use moves::{Move, MovePatch, NewMove};
