//! Error types for the engine.

use std::ops::Range;
use std::path::PathBuf;

use rw_core::CoreError;
use rw_mechanics::MechError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Hard failures: broken scenario data, engine bugs, or I/O.
///
/// Rule failures a player causes are not errors; they come back as a
/// failed [`ActionOutcome`](crate::ActionOutcome).
#[derive(Debug, Error)]
pub enum EngineError {
    /// World model invariant violation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Rules or encounter invariant violation.
    #[error(transparent)]
    Mech(#[from] MechError),

    /// Scenario data references something that does not exist.
    #[error("scenario error: {0}")]
    Scenario(String),

    /// A file could not be read or written.
    #[error("{path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A file did not contain valid JSON for its type.
    #[error("{path}: {source}")]
    Json {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },

    /// A world state could not be encoded or decoded.
    #[error("world state: {0}")]
    State(#[from] serde_json::Error),

    /// No save exists under the given slot.
    #[error("no saved game in slot '{0}'")]
    MissingSlot(String),

    /// An action could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A syntax error in action text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    /// Byte range of the offending input.
    pub span: Range<usize>,
    /// Human-readable description.
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(span: Range<usize>, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}
