//! Dice types, expressions, and rolling.
//!
//! Rules data writes dice as text (`"2d6+1"`, `"d20"`, `"3"`). Those are
//! parsed once into a [`DiceExpr`] and rolled with the per-action `StdRng`,
//! so a game replays identically from the same seed.

pub mod expr;
pub mod roll;

pub use expr::DiceExpr;
pub use roll::{DieResult, RollResult};

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// A polyhedral die type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Die {
    /// Four-sided die.
    D4,
    /// Six-sided die.
    D6,
    /// Eight-sided die.
    D8,
    /// Ten-sided die.
    D10,
    /// Twelve-sided die.
    D12,
    /// Twenty-sided die.
    D20,
    /// Percentile die (1-100).
    D100,
    /// A die with a custom number of sides.
    Custom(u32),
}

impl Die {
    /// Returns the number of sides on this die.
    pub fn sides(self) -> u32 {
        match self {
            Self::D4 => 4,
            Self::D6 => 6,
            Self::D8 => 8,
            Self::D10 => 10,
            Self::D12 => 12,
            Self::D20 => 20,
            Self::D100 => 100,
            Self::Custom(n) => n,
        }
    }

    /// The die with the given number of sides, if it is a real die.
    pub fn with_sides(sides: u32) -> Option<Self> {
        match sides {
            4 => Some(Self::D4),
            6 => Some(Self::D6),
            8 => Some(Self::D8),
            10 => Some(Self::D10),
            12 => Some(Self::D12),
            20 => Some(Self::D20),
            100 => Some(Self::D100),
            n if n >= 2 => Some(Self::Custom(n)),
            _ => None,
        }
    }

    /// Parse a die from a string like "d20", "d6", "d100".
    pub fn from_str_tag(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        let sides = s.strip_prefix('d')?.parse::<u32>().ok()?;
        Self::with_sides(sides)
    }

    /// Roll this die once.
    pub fn roll(self, rng: &mut StdRng) -> u32 {
        rng.random_range(1..=self.sides())
    }
}

impl std::fmt::Display for Die {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// How a d20 roll is made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Advantage {
    /// One die.
    #[default]
    Normal,
    /// Two dice, keep the higher.
    Advantage,
    /// Two dice, keep the lower.
    Disadvantage,
}

impl Advantage {
    /// Combine two sources; advantage and disadvantage cancel out.
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Normal, x) | (x, Self::Normal) => x,
            (a, b) if a == b => a,
            _ => Self::Normal,
        }
    }
}

/// Roll a d20 with advantage or disadvantage. Returns the kept die and every die rolled.
pub fn roll_d20(rng: &mut StdRng, advantage: Advantage) -> (u32, Vec<u32>) {
    let first = Die::D20.roll(rng);
    match advantage {
        Advantage::Normal => (first, vec![first]),
        Advantage::Advantage => {
            let second = Die::D20.roll(rng);
            (first.max(second), vec![first, second])
        }
        Advantage::Disadvantage => {
            let second = Die::D20.roll(rng);
            (first.min(second), vec![first, second])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn die_sides() {
        assert_eq!(Die::D4.sides(), 4);
        assert_eq!(Die::D20.sides(), 20);
        assert_eq!(Die::D100.sides(), 100);
        assert_eq!(Die::Custom(30).sides(), 30);
    }

    #[test]
    fn die_from_str() {
        assert_eq!(Die::from_str_tag("d20"), Some(Die::D20));
        assert_eq!(Die::from_str_tag("D6"), Some(Die::D6));
        assert_eq!(Die::from_str_tag("d30"), Some(Die::Custom(30)));
        assert_eq!(Die::from_str_tag("d1"), None);
        assert_eq!(Die::from_str_tag("foo"), None);
    }

    #[test]
    fn die_display() {
        assert_eq!(Die::D20.to_string(), "d20");
        assert_eq!(Die::Custom(30).to_string(), "d30");
    }

    #[test]
    fn advantage_keeps_the_higher_die() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let (kept, all) = roll_d20(&mut rng, Advantage::Advantage);
            assert_eq!(all.len(), 2);
            assert_eq!(kept, all[0].max(all[1]));
            let (kept, all) = roll_d20(&mut rng, Advantage::Disadvantage);
            assert_eq!(kept, all[0].min(all[1]));
        }
    }

    #[test]
    fn advantage_and_disadvantage_cancel() {
        assert_eq!(
            Advantage::Advantage.combine(Advantage::Disadvantage),
            Advantage::Normal
        );
        assert_eq!(
            Advantage::Normal.combine(Advantage::Disadvantage),
            Advantage::Disadvantage
        );
        assert_eq!(
            Advantage::Advantage.combine(Advantage::Advantage),
            Advantage::Advantage
        );
    }
}
