//! Modifier stacks.
//!
//! A tracked stat keeps the value it had before the first temporary
//! modifier arrived (`base`) plus the ordered list of active modifiers. The
//! live value is always `base` folded through the list, so removing any
//! entry is a recompute, never an arithmetic undo.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::stats::{StatPath, StatValue};

/// How a modifier combines with the value beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModMode {
    /// Replace the value.
    Set,
    /// Add to a number.
    Add,
    /// Subtract from a number.
    Sub,
    /// Multiply a number, truncating toward zero.
    Mul,
    /// Append to a list.
    Append,
    /// Boolean or; on lists, append without duplicates.
    Or,
}

impl fmt::Display for ModMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Set => "set",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Append => "append",
            Self::Or => "or",
        };
        write!(f, "{s}")
    }
}

/// A modifier operand. Numbers stay integers unless a fractional factor is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModValue {
    /// An integer amount.
    Int(i64),
    /// A fractional factor, only meaningful for `mul`.
    Factor(f64),
    /// A flag.
    Bool(bool),
    /// List entries.
    List(Vec<String>),
    /// Text; for `add`/`sub` this is a dice expression rolled on application.
    Text(String),
}

impl fmt::Display for ModValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Factor(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One resolved entry on a stack, tagged with the effect that pushed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    /// Uid of the owning effect.
    pub effect_uid: u64,
    /// Combination mode.
    pub mode: ModMode,
    /// Operand, with any dice already rolled.
    pub value: ModValue,
}

impl Modifier {
    /// Combine this modifier with the value beneath it.
    pub fn apply(&self, path: &StatPath, current: StatValue) -> CoreResult<StatValue> {
        let mismatch = |current: &StatValue| CoreError::StatTypeMismatch {
            path: path.to_string(),
            detail: format!(
                "cannot {} {} onto {}",
                self.mode,
                self.value,
                current.type_name()
            ),
        };

        let result = match (self.mode, current, &self.value) {
            (ModMode::Set, _, ModValue::Int(n)) => StatValue::Int(*n),
            (ModMode::Set, _, ModValue::Bool(b)) => StatValue::Bool(*b),
            (ModMode::Set, _, ModValue::List(items)) => StatValue::List(items.clone()),
            (ModMode::Set, _, ModValue::Text(s)) => StatValue::Text(s.clone()),

            (ModMode::Add, StatValue::Int(a), ModValue::Int(b)) => StatValue::Int(a + b),
            (ModMode::Sub, StatValue::Int(a), ModValue::Int(b)) => StatValue::Int(a - b),
            (ModMode::Mul, StatValue::Int(a), ModValue::Int(b)) => StatValue::Int(a * b),
            (ModMode::Mul, StatValue::Int(a), ModValue::Factor(x)) => {
                StatValue::Int((a as f64 * x).trunc() as i64)
            }

            (ModMode::Append, StatValue::List(mut items), ModValue::List(extra)) => {
                items.extend(extra.iter().cloned());
                StatValue::List(items)
            }
            (ModMode::Append, StatValue::List(mut items), ModValue::Text(s)) => {
                items.push(s.clone());
                StatValue::List(items)
            }

            (ModMode::Or, StatValue::Bool(a), ModValue::Bool(b)) => StatValue::Bool(a || *b),
            (ModMode::Or, StatValue::List(mut items), ModValue::List(extra)) => {
                for entry in extra {
                    if !items.contains(entry) {
                        items.push(entry.clone());
                    }
                }
                StatValue::List(items)
            }
            (ModMode::Or, StatValue::List(mut items), ModValue::Text(s)) => {
                if !items.contains(s) {
                    items.push(s.clone());
                }
                StatValue::List(items)
            }

            (_, current, _) => return Err(mismatch(&current)),
        };
        Ok(result)
    }
}

/// Base value plus the active modifiers for one stat path of one being.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierStack {
    /// Value before any tracked modifier; permanent changes adjust it directly.
    pub base: StatValue,
    /// Active modifiers in application order.
    pub entries: Vec<Modifier>,
}

impl ModifierStack {
    /// Start tracking a stat whose current value is `base`.
    pub fn new(base: StatValue) -> Self {
        Self {
            base,
            entries: Vec::new(),
        }
    }

    /// Fold the base through every entry in order.
    pub fn fold(&self, path: &StatPath) -> CoreResult<StatValue> {
        self.entries
            .iter()
            .try_fold(self.base.clone(), |acc, m| m.apply(path, acc))
    }

    /// Remove every entry tagged with `effect_uid`. Returns how many were removed.
    pub fn remove_effect(&mut self, effect_uid: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|m| m.effect_uid != effect_uid);
        before - self.entries.len()
    }

    /// True once no modifiers remain.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
