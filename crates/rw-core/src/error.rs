use crate::id::ObjectId;
use crate::object::ObjectKind;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Invariant violations in the world model.
///
/// Every variant here means malformed scenario data or an engine bug. Rule
/// failures a player can cause (wrong target, not enough arrows) are checked
/// by callers before they reach the registry.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested object is not registered.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// The object exists but has a different kind than the operation needs.
    #[error("{id} is a {actual}, expected {expected}")]
    WrongKind {
        /// The offending object.
        id: ObjectId,
        /// The kind the caller required.
        expected: ObjectKind,
        /// The kind the object actually has.
        actual: ObjectKind,
    },

    /// Only items may be owned by another object; everything else hangs off the root.
    #[error("{kind} \"{name}\" cannot be owned by {owner}")]
    InvalidOwner {
        /// Display name of the object being registered.
        name: String,
        /// Kind of the object being registered.
        kind: ObjectKind,
        /// The owner that was requested.
        owner: ObjectId,
    },

    /// An item was registered without a container.
    #[error("item \"{0}\" has no owner")]
    OrphanItem(String),

    /// A move asked for more of a stack than exists.
    #[error("cannot move {requested} of {item}: only {available} available")]
    InsufficientQuantity {
        /// The stack being moved.
        item: ObjectId,
        /// Requested quantity.
        requested: u32,
        /// Quantity actually held.
        available: u32,
    },

    /// Moving the item would place it inside itself.
    #[error("cannot move {item} into {owner}: ownership would form a cycle")]
    WouldCycle {
        /// The item being moved.
        item: ObjectId,
        /// The requested new owner.
        owner: ObjectId,
    },

    /// A stat path string from scenario data could not be parsed.
    #[error("unknown stat path: {0}")]
    UnknownStatPath(String),

    /// A modifier or assignment does not fit the stat's value type.
    #[error("type mismatch at {path}: {detail}")]
    StatTypeMismatch {
        /// The stat path being modified.
        path: String,
        /// What went wrong.
        detail: String,
    },

    /// The registry tree and its indexes disagree.
    #[error("corrupt registry: {0}")]
    Corrupt(String),
}
