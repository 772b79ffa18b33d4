//! The game engine for Regelwerk.
//!
//! Loads a scenario (rules, module, party), keeps the serializable world
//! state of one game, and resolves narrator actions against it: movement and
//! script states, items and spells, conversations and trading, and
//! encounters. Every action either completes or leaves the world untouched.

/// Real-time clocks for random happenings.
pub mod clock;
/// Engine configuration.
pub mod config;
/// Error types for the engine.
pub mod error;
/// The game session and action dispatch.
pub mod game;
/// The `do_action(...)` call syntax.
pub mod parser;
/// Saving and loading world states.
pub mod persist;
/// Fuzzy name resolution.
pub mod resolver;
/// Scenario data and its validation.
pub mod scenario;
/// The world state of one game.
pub mod state;

mod combat;
mod context;
mod inventory;
mod navigation;
mod social;

pub use clock::{FixedClock, SystemClock, WallClock};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, ParseError};
pub use game::{ActionOutcome, Game};
pub use parser::{Action, Arg, parse_actions, parse_command_line};
pub use persist::{JsonFileStore, MemoryStore, StateStore};
pub use scenario::{Location, Module, NpcDef, Party, Scenario, validate_scenario};
pub use state::{Mode, WorldState};
