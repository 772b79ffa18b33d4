//! Error types for the mechanics engine.

use rw_core::CoreError;

/// Errors that can occur during mechanics operations.
///
/// These are invariant violations. A player asking for something the rules
/// forbid (attacking out of reach, moving twice) is reported through the
/// `failed` flag of an outcome instead.
#[derive(Debug, thiserror::Error)]
pub enum MechError {
    /// The world model rejected an operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A dice expression in rules data could not be parsed.
    #[error("invalid dice expression: {0}")]
    InvalidDice(String),

    /// An effect definition cannot be applied as written.
    #[error("invalid effect '{name}': {detail}")]
    InvalidEffect {
        /// Effect or source name.
        name: String,
        /// What is wrong with it.
        detail: String,
    },

    /// Effects that end on a successful check are not supported.
    #[error("effect '{0}' ends on a check, which is not supported")]
    CheckTermination(String),

    /// A monster type referenced by scenario data does not exist.
    #[error("unknown monster type: {0}")]
    UnknownMonster(String),

    /// The encounter bookkeeping disagrees with the registry.
    #[error("encounter error: {0}")]
    Encounter(String),
}

/// Convenience result type for mechanics operations.
pub type MechResult<T> = Result<T, MechError>;
