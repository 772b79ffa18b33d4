//! Dice roll results.

use serde::{Deserialize, Serialize};

use super::Die;

/// The result of rolling a single die.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieResult {
    /// The type of die that was rolled.
    pub die: Die,
    /// The value rolled (1 to die.sides()).
    pub value: u32,
}

/// The result of rolling a dice expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    /// Individual die results.
    pub dice: Vec<DieResult>,
    /// Flat modifier added after the dice.
    pub modifier: i64,
}

impl RollResult {
    /// Sum of all die values plus the modifier.
    pub fn total(&self) -> i64 {
        self.dice.iter().map(|d| i64::from(d.value)).sum::<i64>() + self.modifier
    }

    /// Total floored at zero, for damage and healing.
    pub fn amount(&self) -> i64 {
        self.total().max(0)
    }

    /// The highest single die value, or 0 if empty.
    pub fn highest(&self) -> u32 {
        self.dice.iter().map(|d| d.value).max().unwrap_or(0)
    }
}

impl std::fmt::Display for RollResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values: Vec<String> = self.dice.iter().map(|d| d.value.to_string()).collect();
        match self.modifier {
            0 => write!(f, "[{}] = {}", values.join(", "), self.total()),
            m if m > 0 => write!(f, "[{}] + {m} = {}", values.join(", "), self.total()),
            m => write!(f, "[{}] - {} = {}", values.join(", "), -m, self.total()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(values: &[u32], modifier: i64) -> RollResult {
        RollResult {
            dice: values
                .iter()
                .map(|v| DieResult {
                    die: Die::D6,
                    value: *v,
                })
                .collect(),
            modifier,
        }
    }

    #[test]
    fn total_includes_modifier() {
        assert_eq!(make_result(&[3, 4], 2).total(), 9);
        assert_eq!(make_result(&[1], -3).total(), -2);
        assert_eq!(make_result(&[1], -3).amount(), 0);
    }

    #[test]
    fn highest() {
        assert_eq!(make_result(&[2, 6, 1], 0).highest(), 6);
        assert_eq!(RollResult::default().highest(), 0);
    }

    #[test]
    fn display() {
        assert_eq!(make_result(&[3, 4], 0).to_string(), "[3, 4] = 7");
        assert_eq!(make_result(&[3, 4], 1).to_string(), "[3, 4] + 1 = 8");
        assert_eq!(make_result(&[3], -1).to_string(), "[3] - 1 = 2");
    }
}
