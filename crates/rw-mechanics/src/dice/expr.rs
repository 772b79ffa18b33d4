//! Dice expressions: `NdM`, `NdM+K`, `dM`, or a flat number.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::roll::{DieResult, RollResult};
use super::Die;
use crate::error::{MechError, MechResult};

const MAX_DICE: u32 = 100;

/// A parsed dice expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceExpr {
    /// Number of dice; 0 for a flat value.
    pub count: u32,
    /// The die rolled, if any.
    pub die: Option<Die>,
    /// Flat modifier.
    pub modifier: i64,
}

impl DiceExpr {
    /// A constant.
    pub fn flat(value: i64) -> Self {
        Self {
            count: 0,
            die: None,
            modifier: value,
        }
    }

    /// `count` dice of one type with no modifier.
    pub fn dice(count: u32, die: Die) -> Self {
        Self {
            count,
            die: Some(die),
            modifier: 0,
        }
    }

    /// Add a flat modifier.
    pub fn plus(mut self, modifier: i64) -> Self {
        self.modifier += modifier;
        self
    }

    /// Roll the expression.
    pub fn roll(&self, rng: &mut StdRng) -> RollResult {
        let dice = match self.die {
            Some(die) => (0..self.count)
                .map(|_| DieResult {
                    die,
                    value: die.roll(rng),
                })
                .collect(),
            None => Vec::new(),
        };
        RollResult {
            dice,
            modifier: self.modifier,
        }
    }

    /// Lowest possible total.
    pub fn min(&self) -> i64 {
        match self.die {
            Some(_) => i64::from(self.count) + self.modifier,
            None => self.modifier,
        }
    }

    /// Highest possible total.
    pub fn max(&self) -> i64 {
        match self.die {
            Some(die) => i64::from(self.count) * i64::from(die.sides()) + self.modifier,
            None => self.modifier,
        }
    }
}

impl FromStr for DiceExpr {
    type Err = MechError;

    fn from_str(s: &str) -> MechResult<Self> {
        let invalid = || MechError::InvalidDice(s.to_string());
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if compact.is_empty() {
            return Err(invalid());
        }
        if let Ok(n) = compact.parse::<i64>() {
            return Ok(Self::flat(n));
        }

        let (count, rest) = compact.split_once('d').ok_or_else(invalid)?;
        let count = if count.is_empty() {
            1
        } else {
            count.parse::<u32>().map_err(|_| invalid())?
        };
        if count == 0 || count > MAX_DICE {
            return Err(invalid());
        }

        let split = rest.find(['+', '-']).unwrap_or(rest.len());
        let (sides, modifier) = rest.split_at(split);
        let sides = sides.parse::<u32>().map_err(|_| invalid())?;
        let die = Die::with_sides(sides).ok_or_else(invalid)?;
        let modifier = match modifier {
            "" => 0,
            m => {
                let value = m.strip_prefix('+').unwrap_or(m);
                value.parse::<i64>().map_err(|_| invalid())?
            }
        };

        Ok(Self {
            count,
            die: Some(die),
            modifier,
        })
    }
}

impl TryFrom<String> for DiceExpr {
    type Error = MechError;

    fn try_from(s: String) -> MechResult<Self> {
        s.parse()
    }
}

impl From<DiceExpr> for String {
    fn from(expr: DiceExpr) -> Self {
        expr.to_string()
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(die) = self.die else {
            return write!(f, "{}", self.modifier);
        };
        write!(f, "{}{die}", self.count)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}
