//! Core types for Regelwerk: world objects, stats, and the object registry.
//!
//! Every mutable thing in a game (characters, monsters, NPCs, items and the
//! per-game state of locations) is a [`WorldObject`] living in a
//! [`Registry`]. The registry is an arena keyed by unique name; ownership is
//! expressed by each object listing the handles of the items it holds.

/// Error types used throughout the crate.
pub mod error;
/// Unique names and game identifiers.
pub mod id;
/// Modifier stacks that keep temporary stat changes reversible.
pub mod modifier;
/// Typed world objects: beings, items, location states.
pub mod object;
/// The object registry (arena + ownership tree).
pub mod registry;
/// Stat blocks and stat paths.
pub mod stats;

/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export identifier types.
pub use id::{GameId, ObjectId};
/// Re-export modifier types.
pub use modifier::{ModMode, ModValue, Modifier, ModifierStack};
/// Re-export object types.
pub use object::{
    Attack, Being, EncounterRecord, Equipment, ItemState, LocationState, ObjectBody, ObjectKind,
    WorldObject,
};
/// Re-export registry types.
pub use registry::{Owner, Registry};
/// Re-export stat types.
pub use stats::{BasicStat, BasicStats, StatPath, StatValue, Stats};
